use bytemuck::{Pod, Zeroable};

use crate::audio::features::EngineOutput;
use crate::engine::OutputHandle;

/// Uniform block for audio-reactive shaders (`u_resolution`, `u_time`, `u_bass`, ...)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ShaderUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub frame: u32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat: f32,
}

impl Default for ShaderUniforms {
    fn default() -> Self {
        Self {
            resolution: [1920.0, 1080.0],
            time: 0.0,
            frame: 0,
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            beat: 0.0,
        }
    }
}

impl ShaderUniforms {
    pub fn from_output(output: &EngineOutput, resolution: [f32; 2], time: f32, frame: u32) -> Self {
        Self {
            resolution,
            time,
            frame,
            bass: output.bass,
            mid: output.mid,
            treble: output.treble,
            beat: output.beat,
        }
    }
}

/// Builds a uniform block per rendered frame from the engine's published output
pub struct UniformFeed {
    output: OutputHandle,
    resolution: [f32; 2],
    frame: u32,
}

impl UniformFeed {
    pub fn new(output: OutputHandle, width: u32, height: u32) -> Self {
        Self {
            output,
            resolution: [width as f32, height as f32],
            frame: 0,
        }
    }

    pub fn next_frame(&mut self, time: f32) -> ShaderUniforms {
        let uniforms = ShaderUniforms::from_output(&self.output.load(), self.resolution, time, self.frame);
        self.frame = self.frame.wrapping_add(1);
        uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;

    #[test]
    fn layout_is_gpu_friendly() {
        assert_eq!(std::mem::size_of::<ShaderUniforms>(), 32);
        let uniforms = ShaderUniforms::default();
        let bytes = bytemuck::bytes_of(&uniforms);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn feed_counts_frames_and_reads_published_output() {
        let engine = Engine::new(&EngineConfig::default());
        let mut feed = UniformFeed::new(engine.output(), 640, 480);

        let first = feed.next_frame(0.0);
        let second = feed.next_frame(1.0 / 60.0);
        assert_eq!(first.frame, 0);
        assert_eq!(second.frame, 1);
        assert_eq!(second.resolution, [640.0, 480.0]);
        assert_eq!(second.beat, 0.0);
    }
}
