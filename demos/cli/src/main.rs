use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use rayon::prelude::*;

use sdfx::{
    context::SceneNode, eval::BasicAtoms, record::Record, CompileConfig,
    Compiled, UnknownPolicy,
};

/// Compiles SDF scenes into shader expressions
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Input file, either a `.json` record or a `.rhai` script
    #[clap(short, long)]
    input: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Prints the compiled distance expression
    Compile {
        #[clap(flatten)]
        settings: CompileSettings,

        /// Name of the query point variable
        #[clap(short, long, default_value = "center")]
        coord: String,
    },

    /// Prints the input record in shader notation
    Notation,

    /// Evaluates the scene on a pixel grid, using built-in primitives
    Preview {
        #[clap(flatten)]
        settings: CompileSettings,

        #[clap(flatten)]
        output: ImageSettings,
    },
}

#[derive(Parser)]
struct CompileSettings {
    /// Fail on unrecognized operators instead of reconstructing them
    #[clap(long)]
    reject_unknown: bool,

    /// Maximum scene depth
    #[clap(long)]
    max_depth: Option<usize>,
}

#[derive(Parser)]
struct ImageSettings {
    /// Name of a `.png` file to write (otherwise, prints ASCII art)
    #[clap(short, long)]
    out: Option<PathBuf>,

    /// Number of threads to use
    #[clap(short, long)]
    threads: Option<NonZeroUsize>,

    /// Image size
    #[clap(short, long, default_value_t = 64)]
    size: u32,
}

////////////////////////////////////////////////////////////////////////////////

/// Loads the input file as a record
fn load(path: &Path) -> Result<Record> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("rhai") => {
            let script = std::fs::read_to_string(path)?;
            let mut engine = sdfx::rhai::Engine::new();
            let out = engine.run(&script)?;
            let Some((first, rest)) = out.scenes.split_first() else {
                bail!("script did not draw any scenes");
            };
            let scene =
                rest.iter().fold(first.clone(), |acc, s| acc.unite(s));
            Ok(Record::from(&scene))
        }
        Some("json") | None => {
            let file = std::fs::File::open(path)?;
            Ok(Record::from_json(std::io::BufReader::new(file))?)
        }
        Some(ext) => bail!("unknown file extension `.{ext}`"),
    }
}

impl CompileSettings {
    fn compile(&self, record: &Record) -> Result<Compiled> {
        let scene = SceneNode::try_from(record)?;
        let cfg = CompileConfig {
            unknown: if self.reject_unknown {
                UnknownPolicy::Reject
            } else {
                UnknownPolicy::Defer
            },
            max_depth: self.max_depth,
        };
        let start = Instant::now();
        let c = cfg.compile(&scene)?;
        info!("Compiled {} nodes in {:?}", scene.len(), start.elapsed());
        Ok(c)
    }
}

/// Pixel classification, used for ASCII output
#[derive(Copy, Clone)]
enum Pixel {
    Interior,
    Border,
    Background,
}

fn smoothstep(lo: f64, hi: f64, x: f64) -> f64 {
    let t = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: [f64; 4], b: [f64; 4], t: f64) -> [f64; 4] {
    std::array::from_fn(|i| a[i] * (1.0 - t) + b[i] * t)
}

/// Shades a single distance sample
fn shade(d: f64, size: u32) -> ([u8; 4], Pixel) {
    const BACKGROUND: [f64; 4] = [0.5, 0.5, 0.5, 0.0];
    const INTERIOR: [f64; 4] = [0.5, 0.5, 0.5, 1.0];
    const BORDER: [f64; 4] = [0.0, 0.0, 0.0, 0.0];
    const BORDER_WIDTH: f64 = 0.01;

    let aa = 2.0 / size as f64;
    let border = smoothstep(-BORDER_WIDTH - aa, -BORDER_WIDTH + aa, d);
    let edge = smoothstep(-aa, aa, d);
    let c = mix(mix(INTERIOR, BORDER, border), BACKGROUND, edge);

    let px = if edge >= 0.5 {
        Pixel::Background
    } else if border >= 0.5 {
        Pixel::Border
    } else {
        Pixel::Interior
    };
    (c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8), px)
}

/// Evaluates the scene over a square image, in parallel by rows
///
/// Pixel centers are mapped to `[-1, 1]` with +y pointing up.
fn preview(c: &Compiled, size: u32) -> Result<Vec<Vec<([u8; 4], Pixel)>>> {
    let s = size as f64;
    (0..size)
        .into_par_iter()
        .map(|row| {
            let y = (2.0 * ((size - row - 1) as f64 + 0.5) - s) / s;
            (0..size)
                .map(|col| -> Result<_> {
                    let x = (2.0 * (col as f64 + 0.5) - s) / s;
                    let d = c.eval(&BasicAtoms, x, y)?;
                    Ok(shade(d, size))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let now = Instant::now();
    let args = Args::parse();
    let record = load(&args.input)
        .with_context(|| format!("failed to load {:?}", args.input))?;
    info!("Loaded file in {:?}", now.elapsed());

    match args.cmd {
        Command::Compile { settings, coord } => {
            let c = settings.compile(&record)?;
            println!("{}", c.apply(&coord)?);
        }
        Command::Notation => {
            println!("{}", sdfx::notation::to_glsl(&record)?);
        }
        Command::Preview { settings, output } => {
            let c = settings.compile(&record)?;
            let start = Instant::now();
            let size = output.size;
            let pixels = match output.threads {
                Some(n) => rayon::ThreadPoolBuilder::new()
                    .num_threads(n.get())
                    .build()?
                    .install(|| preview(&c, size))?,
                None => preview(&c, size)?,
            };
            info!("Rendered {size}x{size} preview in {:?}", start.elapsed());

            if let Some(out) = output.out {
                let buffer: Vec<u8> = pixels
                    .iter()
                    .flatten()
                    .flat_map(|(rgba, _)| *rgba)
                    .collect();
                info!("Writing image to {out:?}");
                image::save_buffer(
                    out,
                    &buffer,
                    size,
                    size,
                    image::ColorType::Rgba8,
                )?;
            } else {
                for row in &pixels {
                    let line: String = row
                        .iter()
                        .map(|(_, p)| match p {
                            Pixel::Interior => '#',
                            Pixel::Border => '+',
                            Pixel::Background => '.',
                        })
                        .collect();
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}
