use std::process::ExitCode;

use clap::Parser;

use worldgen::cancel::CancelToken;
use worldgen::cli::Args;
use worldgen::error::WorldgenError;
use worldgen::{generate, ir, log_info, render};

fn run() -> Result<(), WorldgenError> {
    let args = Args::parse();
    cli_configure(&args)?;

    let seed = args.resolve_seed();
    let params = args.to_params();
    let cancel = CancelToken::new();

    log_info!("generating {}x{} world, seed={seed}", args.width, args.height);

    let (world, timings) = generate(seed, args.width, args.height, &params, &cancel)?;

    for t in &timings {
        log_info!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    let rgba = render::render_biome_map(&world.biome, &world.river_flag);
    write_png(&args.out_png, &rgba, args.width, args.height)?;

    let doc = ir::build_ir(&world, &params);
    write_ir(&args.out_ir, &doc)?;

    log_info!("wrote {} and {}", args.out_png.display(), args.out_ir.display());
    Ok(())
}

fn cli_configure(args: &Args) -> Result<(), WorldgenError> {
    worldgen::cli::configure_thread_pool(args.threads)
}

fn write_png(path: &std::path::Path, rgba: &[u8], w: usize, h: usize) -> Result<(), WorldgenError> {
    image::save_buffer(path, rgba, w as u32, h as u32, image::ColorType::Rgba8).map_err(|e| {
        remove_partial(path);
        WorldgenError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    })
}

fn write_ir(path: &std::path::Path, doc: &ir::WorldIr) -> Result<(), WorldgenError> {
    let file = std::fs::File::create(path).map_err(|e| {
        remove_partial(path);
        WorldgenError::Io(e)
    })?;
    serde_json::to_writer(std::io::BufWriter::new(file), doc).map_err(|e| {
        remove_partial(path);
        WorldgenError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
    })
}

fn remove_partial(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("worldgen: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
