use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::config::Settings;
use crate::simulation::engine;
use crate::simulation::grid::Grid;
use crate::simulation::palette::{PaletteStrategy, Rgb};
use crate::simulation::scheduler::{Clock, Scheduler, TimerKind};

/// Lifecycle of a simulation run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No grid to simulate: not started yet, or the viewport has zero area
    Idle,
    /// Rebuilding grid and palette; only observable from inside `start`
    Starting,
    /// Ticking
    Running,
    /// A restart is scheduled but has not fired yet
    Stagnating,
}

/// Discrete commands issued by the windowing harness
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ScaleUp,
    ScaleDown,
    MoreColors,
    FewerColors,
    TogglePalette,
    Restart,
}

/// Drives grid, palette and timers through start, tick, stagnation and restart.
pub struct SimulationController<C: Clock> {
    settings: Settings,
    scheduler: Scheduler<C>,
    rng: StdRng,
    grid: Grid,
    palette: Vec<Rgb>,
    strategy: PaletteStrategy,
    scale: u32,
    color_count: usize,
    viewport: (u32, u32),
    state: RunState,
    steps: u64,
    run_started: Duration,
    fps_text: String,
    /// Number of completed `start` calls, bumped whenever grid or palette are rebuilt
    generation: u64,
}

impl<C: Clock> SimulationController<C> {
    /// Create a controller for a `width x height` pixel viewport. The first start is
    /// scheduled immediately and happens on the next [`SimulationController::poll`].
    pub fn new(settings: Settings, viewport: (u32, u32), clock: C) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut scheduler = Scheduler::new(clock);
        scheduler.arm_once(TimerKind::Restart, Duration::ZERO);

        Self {
            scale: settings.scale.max(1),
            color_count: settings.color_count.max(1),
            settings,
            scheduler,
            rng,
            grid: Grid::empty(),
            palette: Vec::new(),
            strategy: PaletteStrategy::default(),
            viewport,
            state: RunState::Idle,
            steps: 0,
            run_started: Duration::ZERO,
            fps_text: String::new(),
            generation: 0,
        }
    }

    /// Run every timer that is due. Returns true if the grid or palette changed.
    pub fn poll(&mut self) -> bool {
        let mut dirty = false;
        while let Some(kind) = self.scheduler.take_due() {
            dirty |= match kind {
                TimerKind::Restart => {
                    self.start();
                    true
                }
                TimerKind::Tick => self.tick(),
            };
        }
        dirty
    }

    /// Earliest moment `poll` has work to do
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Apply a harness command. Commands that would clamp to the same value are ignored.
    pub fn apply(&mut self, command: Command) {
        let changed = match command {
            Command::ScaleUp => {
                self.scale += 1;
                true
            }
            Command::ScaleDown => decrement(&mut self.scale),
            Command::MoreColors => {
                self.color_count += 1;
                true
            }
            Command::FewerColors => decrement(&mut self.color_count),
            Command::TogglePalette => {
                self.strategy = self.strategy.toggled();
                true
            }
            Command::Restart => true,
        };

        if changed {
            log::debug!("Command {:?} accepted", command);
            self.start();
        } else {
            log::debug!("Command {:?} ignored, already at minimum", command);
        }
    }

    /// Record a new viewport and schedule a debounced restart
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.scheduler.disarm(TimerKind::Tick);
        self.scheduler.arm_once(TimerKind::Restart, self.settings.resize_delay);
        if self.state != RunState::Idle {
            self.state = RunState::Stagnating;
        }
    }

    /// Rebuild grid and palette for the current viewport and start ticking
    pub fn start(&mut self) {
        self.scheduler.disarm(TimerKind::Tick);
        self.scheduler.disarm(TimerKind::Restart);
        self.state = RunState::Starting;

        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            log::info!("Viewport has zero area, waiting for a resize");
            self.grid.resize(0, 0);
            self.fps_text.clear();
            self.state = RunState::Idle;
            self.generation += 1;
            return;
        }

        let rows = (height / self.scale) as usize + 1;
        let cols = (width / self.scale) as usize + 1;

        log::info!("(Re)starting");
        log::info!("  Resolution:     {}x{} px", width, height);
        log::info!("  Scaling factor: {}x", self.scale);
        log::info!("  Colors:         {} ({})", self.color_count, self.strategy);
        log::debug!("  Grid:           {}x{} cells", cols, rows);

        self.grid.resize(rows, cols);
        self.palette = self.strategy.generate(self.color_count, &mut self.rng);
        self.grid.randomize(self.color_count, &mut self.rng);

        self.steps = 0;
        self.run_started = self.scheduler.now();
        self.fps_text.clear();
        self.generation += 1;

        self.scheduler.arm_periodic(TimerKind::Tick, self.settings.tick_interval);
        self.state = RunState::Running;
    }

    /// Advance one generation. Returns true if the grid changed.
    pub fn tick(&mut self) -> bool {
        if self.grid.is_empty() {
            return false;
        }

        self.steps += 1;
        let outcome = engine::step(&mut self.grid, self.color_count);
        let elapsed = self.scheduler.now().saturating_sub(self.run_started);

        if !outcome.changed {
            self.report_run(elapsed);
            self.scheduler.disarm(TimerKind::Tick);
            self.scheduler.arm_once(TimerKind::Restart, self.settings.restart_delay);
            self.state = RunState::Stagnating;
            return false;
        }

        // Fires on many rule matches, not few: kept as the restart heuristic
        if outcome.activity <= 0 && !self.scheduler.is_armed(TimerKind::Restart) {
            log::info!(
                "Looks like the automaton entered an infinite loop. Restarting in {} ms",
                self.settings.restart_delay.as_millis()
            );
            self.scheduler.arm_once(TimerKind::Restart, self.settings.restart_delay);
            self.state = RunState::Stagnating;
        }

        self.grid.swap();
        self.update_fps(elapsed);

        if elapsed > self.settings.max_run_lifetime {
            log::info!("Run exceeded its maximum lifetime, restarting");
            self.start();
        }

        true
    }

    /// Set `amount` random cells to random colors without restarting
    pub fn perturb(&mut self, amount: usize) {
        if self.grid.is_empty() {
            return;
        }
        let rows = self.grid.rows() as isize;
        let cols = self.grid.cols() as isize;
        let upper = self.color_count as u32;
        for _ in 0..amount {
            let y = self.rng.gen_range(0..rows);
            let x = self.rng.gen_range(0..cols);
            let color = self.rng.gen_range(0..upper);
            self.grid.set(y, x, color);
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// Viewport size in pixels as last reported by the harness
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn color_count(&self) -> usize {
        self.color_count
    }

    pub fn strategy(&self) -> PaletteStrategy {
        self.strategy
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clock(&self) -> &C {
        self.scheduler.clock()
    }

    /// Frames per second of the current run, e.g. `"39.87 FPS"`; empty until measurable
    pub fn fps_text(&self) -> &str {
        &self.fps_text
    }

    fn update_fps(&mut self, elapsed: Duration) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if elapsed_ms <= 0.0 {
            return;
        }
        let fps = self.steps as f64 * 1000.0 / elapsed_ms;
        if fps.is_finite() {
            self.fps_text = format!("{:.2} FPS", fps);
        }
    }

    fn report_run(&self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        if self.steps == 0 {
            log::info!("Done, this lasted {:.5} seconds and 0 steps", seconds);
            return;
        }
        let ms_per_step = seconds * 1000.0 / self.steps as f64;
        log::info!(
            "Done, this lasted {:.5} seconds and {} steps, that is, {:.5} ms per step",
            seconds,
            self.steps,
            ms_per_step
        );
    }

    #[cfg(test)]
    fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

/// Decrement keeping the value at 1 or above; false if already at the floor
fn decrement<T>(value: &mut T) -> bool
where
    T: Copy + PartialOrd + std::ops::SubAssign + From<u8>,
{
    if *value > T::from(1) {
        *value -= T::from(1);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::scheduler::ManualClock;
    use std::rc::Rc;

    type TestController = SimulationController<Rc<ManualClock>>;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn settings() -> Settings {
        Settings {
            tick_interval: ms(25),
            restart_delay: ms(800),
            resize_delay: ms(1000),
            max_run_lifetime: ms(60_000),
            color_count: 5,
            scale: 3,
            seed: Some(1234),
        }
    }

    fn controller(viewport: (u32, u32)) -> (Rc<ManualClock>, TestController) {
        let clock = Rc::new(ManualClock::new());
        let controller = SimulationController::new(settings(), viewport, clock.clone());
        (clock, controller)
    }

    fn started(viewport: (u32, u32)) -> (Rc<ManualClock>, TestController) {
        let (clock, mut c) = controller(viewport);
        assert!(c.poll());
        assert_eq!(c.state(), RunState::Running);
        (clock, c)
    }

    fn make_uniform(c: &mut TestController) {
        let rows = c.grid().rows() as isize;
        let cols = c.grid().cols() as isize;
        for y in 0..rows {
            for x in 0..cols {
                c.grid_mut().set(y, x, 2);
            }
        }
    }

    #[test]
    fn test_first_start_on_poll() {
        let (_clock, mut c) = controller((30, 60));
        assert_eq!(c.state(), RunState::Idle);
        assert!(c.poll());
        assert_eq!(c.state(), RunState::Running);
        assert_eq!(c.generation(), 1);
        // rows = 60/3 + 1, cols = 30/3 + 1
        assert_eq!((c.grid().rows(), c.grid().cols()), (21, 11));
        assert_eq!(c.palette().len(), 5);
        assert!(c.grid().cells().iter().all(|&v| v < 5));
    }

    #[test]
    fn test_tick_advances_steps_and_fps() {
        let (clock, mut c) = started((90, 90));
        clock.advance(ms(25));
        c.poll();
        assert_eq!(c.steps(), 1);
        assert_eq!(c.fps_text(), "40.00 FPS");
    }

    #[test]
    fn test_fps_skipped_at_zero_elapsed() {
        let (_clock, mut c) = started((90, 90));
        assert!(c.tick());
        assert_eq!(c.steps(), 1);
        assert_eq!(c.fps_text(), "");
    }

    #[test]
    fn test_uniform_grid_stagnates() {
        let (clock, mut c) = started((30, 30));
        make_uniform(&mut c);
        clock.advance(ms(25));
        assert!(!c.poll());
        assert_eq!(c.state(), RunState::Stagnating);
        assert_eq!(c.next_deadline(), Some(ms(25 + 800)));

        // No further ticks while waiting for the restart
        clock.advance(ms(400));
        c.poll();
        assert_eq!(c.steps(), 1);

        clock.advance(ms(400));
        assert!(c.poll());
        assert_eq!(c.state(), RunState::Running);
        assert_eq!(c.generation(), 2);
        assert_eq!(c.steps(), 0);
    }

    #[test]
    fn test_resize_reseeds() {
        let (clock, mut c) = started((30, 30));
        for _ in 0..3 {
            clock.advance(ms(25));
            c.poll();
        }
        c.resize(60, 90);
        assert_eq!(c.state(), RunState::Stagnating);
        clock.advance(ms(1000));
        c.poll();
        assert_eq!((c.grid().rows(), c.grid().cols()), (31, 21));
        assert_eq!(c.steps(), 0);
        assert_eq!(c.state(), RunState::Running);
    }

    #[test]
    fn test_resizes_coalesce() {
        let (clock, mut c) = started((30, 30));
        let before = c.generation();
        c.resize(40, 40);
        clock.advance(ms(10));
        c.resize(50, 50);
        clock.advance(ms(2000));
        c.poll();
        assert_eq!(c.generation(), before + 1);
        assert_eq!((c.grid().rows(), c.grid().cols()), (17, 17));
    }

    #[test]
    fn test_resize_suppresses_ticks() {
        let (clock, mut c) = started((30, 30));
        c.resize(30, 30);
        clock.advance(ms(500));
        c.poll();
        assert_eq!(c.steps(), 0);
    }

    #[test]
    fn test_commands_clamp_at_one() {
        let (_clock, mut c) = started((30, 30));
        for _ in 0..10 {
            c.apply(Command::ScaleDown);
            c.apply(Command::FewerColors);
        }
        assert_eq!(c.scale(), 1);
        assert_eq!(c.color_count(), 1);
        assert_eq!(c.palette().len(), 1);

        // At the floor: no restart
        let generation = c.generation();
        c.apply(Command::ScaleDown);
        c.apply(Command::FewerColors);
        assert_eq!(c.generation(), generation);
    }

    #[test]
    fn test_commands_restart() {
        let (clock, mut c) = started((30, 30));
        clock.advance(ms(25));
        c.poll();

        c.apply(Command::ScaleUp);
        assert_eq!(c.scale(), 4);
        assert_eq!(c.steps(), 0);
        assert_eq!((c.grid().rows(), c.grid().cols()), (8, 8));

        c.apply(Command::MoreColors);
        assert_eq!(c.palette().len(), 6);

        c.apply(Command::TogglePalette);
        assert_eq!(c.strategy(), PaletteStrategy::MeltingIce);
        assert_eq!(c.palette(), PaletteStrategy::MeltingIce.generate(6, &mut StdRng::seed_from_u64(0)));

        let generation = c.generation();
        c.apply(Command::Restart);
        assert_eq!(c.generation(), generation + 1);
        assert_eq!(c.state(), RunState::Running);
    }

    #[test]
    fn test_command_preempts_pending_restart() {
        let (clock, mut c) = started((30, 30));
        make_uniform(&mut c);
        clock.advance(ms(25));
        c.poll();
        assert_eq!(c.state(), RunState::Stagnating);

        c.apply(Command::Restart);
        let generation = c.generation();
        clock.advance(ms(800));
        c.poll();
        // The old restart was cancelled by the manual one
        assert_eq!(c.generation(), generation);
    }

    #[test]
    fn test_zero_area_viewport_is_idle() {
        let (clock, mut c) = controller((0, 200));
        c.poll();
        assert_eq!(c.state(), RunState::Idle);
        assert!(c.grid().is_empty());
        assert!(c.palette().is_empty());
        assert_eq!(c.next_deadline(), None);
        assert!(!c.tick());

        c.resize(30, 30);
        assert_eq!(c.state(), RunState::Idle);
        clock.advance(ms(1000));
        c.poll();
        assert_eq!(c.state(), RunState::Running);
        assert_eq!(c.palette().len(), 5);
    }

    #[test]
    fn test_activity_threshold_schedules_restart() {
        let mut s = settings();
        s.color_count = 1;
        let clock = Rc::new(ManualClock::new());
        let mut c = SimulationController::new(s, (30, 30), clock.clone());
        c.poll();
        c.apply(Command::MoreColors);

        // Checkerboard of 0/1: every cell sees its successor, so the counter reaches zero
        let rows = c.grid().rows() as isize;
        let cols = c.grid().cols() as isize;
        for y in 0..rows {
            for x in 0..cols {
                c.grid_mut().set(y, x, ((y + x) % 2) as u32);
            }
        }
        clock.advance(ms(25));
        assert!(c.poll());
        assert_eq!(c.state(), RunState::Stagnating);
        // Ticking continues until the restart fires
        assert_eq!(c.next_deadline(), Some(ms(50)));

        let generation = c.generation();
        clock.advance(ms(800));
        c.poll();
        assert_eq!(c.generation(), generation + 1);
    }

    #[test]
    fn test_max_lifetime_forces_restart() {
        let mut s = settings();
        s.max_run_lifetime = ms(100);
        let clock = Rc::new(ManualClock::new());
        let mut c = SimulationController::new(s, (300, 300), clock.clone());
        c.poll();
        let generation = c.generation();
        clock.advance(ms(150));
        c.poll();
        assert_eq!(c.generation(), generation + 1);
        assert_eq!(c.steps(), 0);
    }

    #[test]
    fn test_perturb_keeps_valid_indices() {
        let (_clock, mut c) = started((30, 30));
        make_uniform(&mut c);
        c.perturb(50);
        assert!(c.grid().cells().iter().all(|&v| v < 5));
        assert!(c.grid().cells().iter().any(|&v| v != 2));
    }

    #[test]
    fn test_same_seed_same_grid() {
        let (_a_clock, a) = started((60, 60));
        let (_b_clock, b) = started((60, 60));
        assert_eq!(a.grid().cells(), b.grid().cells());
        assert_eq!(a.palette(), b.palette());
    }
}
