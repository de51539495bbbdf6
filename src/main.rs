use clap::{Parser, Subcommand, ValueEnum};
use responsive_picture::crop::VariantCropResolver;
use responsive_picture::html::{ImageAttributes, render_picture};
use responsive_picture::imaging::RustBackend;
use responsive_picture::picture::{PictureArgs, PictureEnv, build_picture};
use responsive_picture::render::FileRenderer;
use responsive_picture::source::PathResolver;
use responsive_picture::{config, density, output, sizes};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "responsive-picture")]
#[command(about = "Render the image renditions behind a responsive <picture> element")]
#[command(long_about = "\
Render the image renditions behind a responsive <picture> element

Give it a source image, a sizes specification and a list of pixel densities;
it writes one rendition per size and density (plus a fallback image) and
prints the <picture> markup that references them.

  responsive-picture render --image photos/dawn.jpg \\
      --sizes '(max-width: 414px) 378px, (max-width: 575px) 540px, 634px' \\
      --densities '1, 2'

Sizes use the grammar of the HTML sizes attribute: comma-separated
'[<media-condition> ]<width>[px]' entries. A bare width is the default and
supplies the fallback <img>.

Renditions are content-addressed and reused across runs. Run
'responsive-picture gen-config' to generate a documented picture.toml.")]
#[command(version)]
struct Cli {
    /// Storage root: sources must live below it, renditions are written into it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Rendition directory (overrides output.dir from the config). URLs follow
    /// it unless output.public_path is configured separately
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// URL path the rendition directory is served under (overrides
    /// output.public_path)
    #[arg(long, global = true)]
    public_path: Option<String>,

    /// Config file (default: picture.toml in the root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render all renditions of an image and print the <picture> markup
    Render(RenderArgs),
    /// Parse a sizes/densities pair and show the renditions it would produce
    Check(CheckArgs),
    /// Print a stock picture.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Json,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Source image: a path below the root or a file:// URL
    #[arg(long)]
    image: String,

    /// Sizes specification, e.g. '(max-width: 414px) 378px, 634px'
    #[arg(long)]
    sizes: String,

    /// Comma-separated pixel densities
    #[arg(long, default_value = "1")]
    densities: String,

    /// Crop specification (JSON crop variants)
    #[arg(long)]
    crop: Option<String>,

    /// Crop variant to apply
    #[arg(long, default_value = "")]
    crop_variant: String,

    /// Special function: "square" renders exact squares
    #[arg(long, default_value = "")]
    special_function: String,

    /// Output format override, e.g. webp
    #[arg(long)]
    file_extension: Option<String>,

    /// Prefix URLs with output.site_url
    #[arg(long)]
    absolute: bool,

    #[arg(long, default_value = "")]
    alt: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    loading: Option<String>,
    #[arg(long)]
    decoding: Option<String>,
    #[arg(long)]
    ismap: Option<String>,
    #[arg(long)]
    usemap: Option<String>,

    /// Print the <picture> element or the JSON plan
    #[arg(long, value_enum, default_value = "html")]
    format: Format,

    /// Disable the rendition cache and force re-encoding
    #[arg(long)]
    no_cache: bool,

    /// Do not print per-rendition progress
    #[arg(long, short)]
    quiet: bool,
}

impl RenderArgs {
    fn picture_args(&self) -> PictureArgs {
        PictureArgs {
            image: self.image.clone(),
            sizes: self.sizes.clone(),
            densities: self.densities.clone(),
            crop: self.crop.clone(),
            crop_variant: self.crop_variant.clone(),
            special_function: self.special_function.clone(),
            file_extension: self.file_extension.clone(),
            absolute_url: self.absolute,
            attributes: ImageAttributes {
                alt: self.alt.clone(),
                title: self.title.clone(),
                loading: self.loading.clone(),
                decoding: self.decoding.clone(),
                ismap: self.ismap.clone(),
                usemap: self.usemap.clone(),
            },
        }
    }
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Sizes specification
    #[arg(long)]
    sizes: String,

    /// Comma-separated pixel densities
    #[arg(long, default_value = "1")]
    densities: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match &cli.command {
        Command::Render(args) => {
            let picture_config = load_config(&cli)?;
            init_thread_pool(&picture_config.processing);
            render(&cli.root, &picture_config, args)?;
        }
        Command::Check(args) => {
            let picture_config = load_config(&cli)?;
            let sizes = sizes::parse_sizes(&args.sizes);
            let densities =
                density::parse_densities(&args.densities, picture_config.srcset.density_parsing)?;
            let fallback = picture_config.srcset.fallback.select(&sizes);
            output::print_check_output(&sizes, &densities, fallback);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<config::PictureConfig, config::ConfigError> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(config::CONFIG_FILE_NAME));
    log::debug!("loading config from {}", path.display());
    let mut picture_config = config::load_config(&path)?;
    if let Some(dir) = &cli.output {
        picture_config.override_output_dir(&dir.to_string_lossy());
    }
    if let Some(public_path) = &cli.public_path {
        picture_config.output.public_path = public_path.clone();
    }
    picture_config.validate()?;
    Ok(picture_config)
}

fn render(
    root: &Path,
    picture_config: &config::PictureConfig,
    args: &RenderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = picture_config.storage(root);
    let backend = RustBackend::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let quiet = args.quiet;
    let printer = std::thread::spawn(move || {
        for event in rx {
            if !quiet {
                output::print_render_event(&event);
            }
        }
    });
    let renderer = FileRenderer::new(
        &backend,
        &storage,
        picture_config.render_options(!args.no_cache),
    )
    .with_events(tx);

    let allowed = |ext: &str| picture_config.allows_extension(ext);
    let env = PictureEnv {
        resolver: &PathResolver,
        crop_resolver: &VariantCropResolver,
        renderer: &renderer,
        allowed_extension: &allowed,
        policy: picture_config.srcset_policy(),
    };
    let result = build_picture(&args.picture_args(), &env);
    let stats = renderer.cache_stats();
    // Closes the event channel so the printer drains and exits
    drop(renderer);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let picture = result?;

    if !args.quiet {
        println!();
        println!("{}", output::format_render_summary(&stats));
        println!();
    }
    match args.format {
        Format::Html => println!("{}", render_picture(&picture).into_string()),
        Format::Json => println!("{}", serde_json::to_string_pretty(&picture)?),
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
