fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/gtfs-realtime.proto");

    let protoc_path = protoc_bin_vendored::protoc_bin_path()?;

    unsafe {
        std::env::set_var("PROTOC", protoc_path);
    }

    // Enumerations surface in JSON output by their symbolic names.
    prost_build::Config::new()
        .enum_attribute(
            ".",
            "#[derive(serde::Serialize)] #[serde(rename_all = \"SCREAMING_SNAKE_CASE\")]",
        )
        .compile_protos(&["proto/gtfs-realtime.proto"], &["proto/"])?;

    Ok(())
}
