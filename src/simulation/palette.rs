use rand::Rng;
use std::fmt;

/// A concrete 8-bit RGB color
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack as `0x00BBGGRR` for the render shader's `unpack4x8unorm`
    pub fn packed(self) -> u32 {
        u32::from(self.r) | (u32::from(self.g) << 8) | (u32::from(self.b) << 16)
    }

    /// Build from float channels, truncating like an integer color constructor would
    fn from_channels(r: f64, g: f64, b: f64) -> Self {
        Self::new(channel(r), channel(g), channel(b))
    }
}

fn channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// How the palette is regenerated on every (re)start
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaletteStrategy {
    /// Every entry is an independent uniformly random color
    #[default]
    RandomColors,
    /// Deterministic dark-to-pale-blue ramp followed by a white-to-red ramp
    MeltingIce,
}

impl PaletteStrategy {
    /// Generate `color_count` colors. `rng` is only consumed by [`PaletteStrategy::RandomColors`].
    pub fn generate<R: Rng + ?Sized>(self, color_count: usize, rng: &mut R) -> Vec<Rgb> {
        match self {
            Self::RandomColors => random_colors(color_count, rng),
            Self::MeltingIce => melting_ice(color_count),
        }
    }

    /// The other strategy
    pub fn toggled(self) -> Self {
        match self {
            Self::RandomColors => Self::MeltingIce,
            Self::MeltingIce => Self::RandomColors,
        }
    }
}

impl fmt::Display for PaletteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RandomColors => write!(f, "random colors"),
            Self::MeltingIce => write!(f, "melting ice"),
        }
    }
}

fn random_colors<R: Rng + ?Sized>(color_count: usize, rng: &mut R) -> Vec<Rgb> {
    (0..color_count)
        .map(|_| Rgb::new(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

fn melting_ice(color_count: usize) -> Vec<Rgb> {
    let split = color_count * 3 / 4;
    let mut colors = Vec::with_capacity(color_count);

    // Near-black to pale blue
    if split > 0 {
        let coef = 255.0 / split as f64;
        let blue_step = 200.0 / split as f64;
        for i in 0..split {
            let i = i as f64;
            colors.push(Rgb::from_channels(coef * i, coef * i, blue_step * i + 50.0));
        }
    }

    // Mirrored ramp towards white/red; `color_count - split >= 1` whenever color_count >= 1
    let tail = (color_count - split) as f64;
    let coef = 255.0 / tail;
    let red_step = 200.0 / tail;
    for i in split..color_count {
        let j = (color_count - i) as f64;
        colors.push(Rgb::from_channels(red_step * j + 50.0, coef * j, coef * j));
    }

    colors
}
