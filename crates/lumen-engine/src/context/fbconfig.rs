use serde::{Deserialize, Serialize};

/// One framebuffer configuration offered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferConfig {
    pub samples: i32,
    pub depth: i32,
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
    pub stencil: i32,
}

impl FramebufferConfig {
    pub const fn rgba8(depth: i32, stencil: i32, samples: i32) -> Self {
        Self {
            samples,
            depth,
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            stencil,
        }
    }
}

/// Minimum framebuffer properties requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferRequest {
    pub red: i32,
    pub green: i32,
    pub blue: i32,
    pub alpha: i32,
    pub depth: i32,
    pub stencil: i32,
    pub double_buffer: bool,
}

impl Default for FramebufferRequest {
    fn default() -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth: 24,
            stencil: 8,
            double_buffer: true,
        }
    }
}

impl FramebufferRequest {
    pub fn accepts(&self, config: &FramebufferConfig) -> bool {
        config.red >= self.red
            && config.green >= self.green
            && config.blue >= self.blue
            && config.alpha >= self.alpha
            && config.depth >= self.depth
            && config.stencil >= self.stencil
    }
}

/// Picks a framebuffer configuration with a single greedy pass.
///
/// Each candidate is checked against the best values seen so far, one property
/// at a time (samples, depth, red, green, blue, alpha). A candidate
/// takes over when it strictly improves the property being checked and is no
/// worse in the others seen so far. Stencil is only checked by the
/// request filter. The first candidate wins ties. The result
/// depends on enumeration order and is not a true multi-criteria maximum.
pub fn choose_best_config(configs: &[FramebufferConfig]) -> Option<usize> {
    let mut best = None;
    let mut top = FramebufferConfig {
        samples: -1,
        depth: -1,
        red: -1,
        green: -1,
        blue: -1,
        alpha: -1,
        stencil: 0,
    };

    for (index, c) in configs.iter().enumerate() {
        let at_least = |t: &FramebufferConfig| {
            c.samples >= t.samples
                && c.depth >= t.depth
                && c.red >= t.red
                && c.green >= t.green
                && c.blue >= t.blue
                && c.alpha >= t.alpha
        };

        if !at_least(&top) {
            continue;
        }
        if c.samples > top.samples {
            best = Some(index);
            top.samples = c.samples;
        }
        if c.depth > top.depth {
            best = Some(index);
            top.depth = c.depth;
        }
        if c.red > top.red {
            best = Some(index);
            top.red = c.red;
        }
        if c.green > top.green {
            best = Some(index);
            top.green = c.green;
        }
        if c.blue > top.blue {
            best = Some(index);
            top.blue = c.blue;
        }
        if c.alpha > top.alpha {
            best = Some(index);
            top.alpha = c.alpha;
        }
    }

    best
}
