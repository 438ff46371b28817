//! Application options.

use clap::Parser;
use util::Float;

lazy_static! {
    /// The global application options.
    pub static ref OPTIONS: Options = Options::parse();
}

/// System wide options.
#[derive(Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Options {
    /// Number of threads to use for rendering.
    #[clap(
        long = "nthreads",
        short = 't',
        value_name = "NUM",
        default_value_t = 1,
        help = "Use specified number of threads for rendering."
    )]
    n_threads: usize,

    /// Image width in pixels.
    #[clap(long, value_name = "NUM", default_value_t = 512)]
    pub width: u32,

    /// Image height in pixels.
    #[clap(long, value_name = "NUM", default_value_t = 512)]
    pub height: u32,

    /// Samples per pixel.
    #[clap(
        long = "spp",
        short = 's',
        value_name = "NUM",
        default_value_t = 16,
        help = "Samples per pixel."
    )]
    pub num_samples: u32,

    /// Number of paths kept in flight by the wavefront scheduler.
    #[clap(
        long = "npaths",
        value_name = "NUM",
        default_value_t = 65536,
        help = "Number of paths kept in flight."
    )]
    pub num_paths: usize,

    /// Exposure multiplier applied to color channels on output.
    #[clap(long, value_name = "FLOAT", default_value_t = 1.0)]
    pub exposure: Float,

    /// Run each path to completion in a single kernel invocation instead
    /// of wavefront dispatch.
    #[clap(long, help = "Use megakernel scheduling instead of wavefront.")]
    pub megakernel: bool,

    /// Path to the output image file.
    #[clap(
        long = "outfile",
        short = 'o',
        value_name = "FILE",
        default_value = "render.png",
        help = "Write the final image to the given filename."
    )]
    pub image_file: String,
}

impl Options {
    /// Returns the number of threads to use.
    pub fn threads(&self) -> usize {
        let max_threads = num_cpus::get();
        match self.n_threads {
            0 => {
                warn!("Invalid nthreads");
                1
            }
            n if n > max_threads => {
                warn!("Num threads > max logical CPUs {}", max_threads);
                max_threads
            }
            n => n,
        }
    }
}
