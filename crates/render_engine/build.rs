// Build script for Vulkan shader compilation
//
// Compiles the GLSL sources in shaders/ to SPIR-V with glslc from the Vulkan
// SDK. Compilation is skipped (with a warning) when the SDK is not installed,
// so the crate still builds on machines without Vulkan tooling.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=shaders");
    println!("cargo:rerun-if-env-changed=VULKAN_SDK");

    if env::var("SKIP_SHADERS").is_ok() {
        eprintln!("info: Skipping shader compilation (SKIP_SHADERS set)");
        return;
    }

    let vulkan_sdk = match env::var("VULKAN_SDK") {
        Ok(sdk) => sdk,
        Err(_) => {
            eprintln!("warning: VULKAN_SDK not set, shader compilation skipped");
            eprintln!("hint: Install the Vulkan SDK and set VULKAN_SDK to compile shaders");
            return;
        }
    };

    let glslc = if cfg!(target_os = "windows") {
        format!("{vulkan_sdk}\\Bin\\glslc.exe")
    } else {
        format!("{vulkan_sdk}/bin/glslc")
    };

    if !Path::new(&glslc).exists() {
        eprintln!("warning: glslc not found at {glslc}, shader compilation skipped");
        return;
    }

    let shader_dir = PathBuf::from("shaders");
    let target_dir = target_shader_dir();
    if let Err(e) = std::fs::create_dir_all(&target_dir) {
        eprintln!("warning: could not create {}: {e}", target_dir.display());
        return;
    }

    let entries = match std::fs::read_dir(&shader_dir) {
        Ok(entries) => entries,
        Err(_) => {
            eprintln!("info: No shader directory found at {}", shader_dir.display());
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_shader = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("vert" | "frag")
        );
        if !is_shader {
            continue;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let output = target_dir.join(format!("{file_name}.spv"));

        let status = Command::new(&glslc)
            .arg(&path)
            .arg("-o")
            .arg(&output)
            .status();

        match status {
            Ok(status) if status.success() => {
                eprintln!("info: compiled {file_name} -> {}", output.display());
            }
            Ok(status) => {
                panic!("glslc failed on {file_name} with status {status}");
            }
            Err(e) => {
                panic!("failed to run glslc: {e}");
            }
        }
    }
}

/// Resolve <workspace>/target/shaders from OUT_DIR.
fn target_shader_dir() -> PathBuf {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| "target".into()));
    // OUT_DIR is target/<profile>/build/<pkg>-<hash>/out; walk up to target/.
    let mut dir = out_dir.as_path();
    while let Some(parent) = dir.parent() {
        if dir.file_name().and_then(|n| n.to_str()) == Some("target") {
            return dir.join("shaders");
        }
        dir = parent;
    }
    PathBuf::from("target/shaders")
}
