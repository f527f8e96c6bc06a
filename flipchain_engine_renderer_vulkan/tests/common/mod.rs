//! Helpers shared by the GPU test binaries
//!
//! winit allows a single event loop per process, so every test binary drives
//! one hidden window through all of its checks.

#![allow(dead_code)]

use naga::back::spv;
use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::ShaderStage;
use std::path::PathBuf;
use winit::event_loop::EventLoop;
use winit::window::Window;

pub const VERTEX_SHADER: &str = r#"
#version 450
layout(location = 0) in vec3 in_position;
layout(location = 1) in vec4 in_color;
layout(location = 0) out vec4 v_color;
void main() {
    v_color = in_color;
    gl_Position = vec4(in_position, 1.0);
}
"#;

pub const FRAGMENT_SHADER: &str = r#"
#version 450
layout(location = 0) in vec4 v_color;
layout(location = 0) out vec4 out_color;
void main() {
    out_color = v_color;
}
"#;

/// Helper to create a hidden test window
#[allow(deprecated)]
pub fn create_test_window() -> (Window, EventLoop<()>) {
    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();
    // The test harness does not run on the main thread
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }
    let event_loop = builder.build().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Flipchain Vulkan Test")
        .with_inner_size(winit::dpi::PhysicalSize::new(640, 480))
        .with_visible(false);
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

/// Compile a GLSL stage to SPIR-V bytes
///
/// Clip space stays Y-up: the backend flips the viewport itself.
pub fn compile_glsl(source: &str, stage: ShaderStage) -> Vec<u8> {
    let module = Frontend::default().parse(&Options::from(stage), source).unwrap();
    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .unwrap();
    let mut options = spv::Options::default();
    options.flags.remove(spv::WriterFlags::ADJUST_COORDINATE_SPACE);
    let words = spv::write_vec(&module, &info, &options, None).unwrap();
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// Write both test shaders into a per-test directory and return their paths
pub fn write_test_shaders(tag: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("flipchain_vulkan_{}", tag));
    std::fs::create_dir_all(&dir).unwrap();
    let vertex = dir.join("vertex.spv");
    let fragment = dir.join("fragment.spv");
    std::fs::write(&vertex, compile_glsl(VERTEX_SHADER, ShaderStage::Vertex)).unwrap();
    std::fs::write(&fragment, compile_glsl(FRAGMENT_SHADER, ShaderStage::Fragment)).unwrap();
    (vertex, fragment)
}
