use color_eyre::eyre::OptionExt;
use color_eyre::Result;
use naga::{
    back::spv,
    front::glsl::{Frontend, Options},
    valid::{Capabilities, ValidationFlags, Validator},
    ShaderStage,
};
use std::{env, fs, path::Path};

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=shaders");

    compile_shaders()?;

    Ok(())
}

fn compile_shaders() -> Result<()> {
    let cargo_manifest_dir = env::var("CARGO_MANIFEST_DIR")?;
    let shaders_in_dir = Path::new(&cargo_manifest_dir).join("shaders");
    let shaders_out_dir = Path::new(&cargo_manifest_dir).join("shaders-built");
    fs::create_dir_all(&shaders_out_dir)?;

    for entry in fs::read_dir(shaders_in_dir)? {
        let path = entry?.path();

        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_eyre(format!("Shader file has no extension: {:?}", path))?;
        let shader_stage = match ext {
            "vert" => ShaderStage::Vertex,
            "frag" => ShaderStage::Fragment,
            _ => {
                println!("cargo:warning=Skipping non-GLSL file: {:?}", path);
                continue;
            }
        };

        let source = fs::read_to_string(&path)?;
        let module = Frontend::default().parse(&Options::from(shader_stage), &source)?;

        let validation_info = Validator::new(ValidationFlags::all(), Capabilities::all()).validate(&module)?;

        // The renderer flips the viewport, so clip space is left Y-up
        let mut options = spv::Options::default();
        options.flags.remove(spv::WriterFlags::ADJUST_COORDINATE_SPACE);
        let spv_binary = spv::write_vec(&module, &validation_info, &options, None)?;

        let shader_name = path
            .file_stem()
            .ok_or_eyre("Shader file has no name")?
            .to_str()
            .ok_or_eyre("Shader file name is not valid UTF-8")?;
        fs::write(
            shaders_out_dir.join(format!("{}.spv", shader_name)),
            bytemuck::cast_slice::<u32, u8>(&spv_binary),
        )?;
    }

    Ok(())
}
