//! # QuickQR CLI
//!
//! Command-line interface for generating styled QR codes and managing history.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP server
//! quickqr serve --listen 0.0.0.0:3000
//!
//! # Generate a framed QR code with a logo
//! quickqr generate "https://example.com" --frame scan-me --logo logo.png --out qr.png
//!
//! # Browse and export history
//! quickqr history list
//! quickqr history export 0 latest.png
//! quickqr history clear --yes
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use quickqr::{
    QuickQrError, clipboard,
    compose::{CaptionFont, FrameStyle},
    datauri,
    generator::Generator,
    history::{FileStore, HistoryEntry, HistoryStore},
    server::{self, ServerConfig},
    session::{Composition, LogoAsset},
    style::StyleEdit,
};

/// QuickQR - Styled QR code generator
#[derive(Parser, Debug)]
#[command(name = "quickqr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted history (defaults to the platform data dir)
    #[arg(long, global = true, env = "QUICKQR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, env = "QUICKQR_LISTEN", default_value = "127.0.0.1:3000")]
        listen: String,

        /// TrueType font for frame captions (defaults to the built-in bitmap font)
        #[arg(long, env = "QUICKQR_FONT")]
        font: Option<PathBuf>,

        /// Minutes an idle composition session is kept
        #[arg(long, default_value = "30")]
        session_ttl: u64,

        /// Maximum logo upload size in bytes
        #[arg(long, default_value_t = server::ServerConfig::default().max_logo_bytes)]
        max_logo_bytes: usize,
    },

    /// Generate a QR code image
    Generate {
        /// Text or URL to encode
        text: String,

        /// Foreground color (#RRGGBB)
        #[arg(long, default_value = "#000000")]
        qr_color: String,

        /// Background color (#RRGGBB)
        #[arg(long, default_value = "#FFFFFF")]
        bg_color: String,

        /// Size in pixels (128, 200, 256, 300, 400 or 512)
        #[arg(long, default_value = "300")]
        size: u32,

        /// Frame style: none, scan-me, scan-to-visit, scan-here
        #[arg(long, default_value = "none")]
        frame: FrameStyle,

        /// Logo image drawn over the center
        #[arg(long, value_name = "FILE")]
        logo: Option<PathBuf>,

        /// TrueType font for frame captions
        #[arg(long, env = "QUICKQR_FONT")]
        font: Option<PathBuf>,

        /// Output PNG file (defaults to quickqr-<timestamp>.png)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also append the result to history
        #[arg(long)]
        save: bool,

        /// Also copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Inspect or edit the history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List entries, newest first
    List,
    /// Show one entry
    Show { index: usize },
    /// Write one entry's image to a PNG file
    Export { index: usize, out: PathBuf },
    /// Copy one entry's image to the clipboard
    Copy { index: usize },
    /// Delete one entry
    Remove { index: usize },
    /// Delete every entry
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("quickqr=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), QuickQrError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            font,
            session_ttl,
            max_logo_bytes,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                data_dir: cli.data_dir,
                font_path: font,
                session_ttl: Duration::from_secs(session_ttl * 60),
                max_logo_bytes,
            };
            server::serve(config).await
        }

        Commands::Generate {
            text,
            qr_color,
            bg_color,
            size,
            frame,
            logo,
            font,
            out,
            save,
            copy,
        } => {
            let mut composition = Composition::new();
            composition.set_text(text);
            composition.update_style(&StyleEdit {
                qr_color: Some(qr_color),
                bg_color: Some(bg_color),
                size: Some(size),
            })?;
            composition.select_frame(frame);

            if let Some(path) = logo {
                let bytes = std::fs::read(&path)?;
                composition.set_logo(LogoAsset {
                    bytes,
                    filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                });
            }

            let font = match font {
                Some(path) => CaptionFont::load(&path)?,
                None => CaptionFont::Spleen,
            };

            composition.generate_base(&Generator::default())?;
            let composed = composition.compose(&font)?;
            if let Some(warning) = &composed.warning {
                eprintln!("Warning: {}", warning);
            }

            let out = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "quickqr-{}.png",
                    chrono::Utc::now().timestamp_millis()
                ))
            });
            std::fs::write(&out, datauri::to_png(&composed.image)?)?;
            println!(
                "Saved {}x{} QR code to {}",
                composed.image.width(),
                composed.image.height(),
                out.display()
            );

            if copy {
                clipboard::copy_image(&composed.image)?;
                println!("Copied to clipboard");
            }

            if save {
                let mut history = open_history(cli.data_dir)?;
                history.append(HistoryEntry::new(
                    composed.source_text.clone(),
                    datauri::encode_png(&composed.image)?,
                ));
                println!("Saved to history ({} entries)", history.len());
            }

            Ok(())
        }

        Commands::History { action } => {
            let mut history = open_history(cli.data_dir)?;
            run_history(&mut history, action)
        }
    }
}

fn run_history(history: &mut HistoryStore, action: HistoryAction) -> Result<(), QuickQrError> {
    match action {
        HistoryAction::List => {
            if history.is_empty() {
                println!("History is empty");
            }
            for (i, entry) in history.entries().iter().enumerate() {
                println!(
                    "{:>3}  {}  {}",
                    i,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    truncate(&entry.data, 60)
                );
            }
        }
        HistoryAction::Show { index } => {
            let entry = history.restore(index)?;
            let img = datauri::decode_image(&entry.qr_image)?;
            println!("Data:    {}", entry.data);
            println!("Created: {}", entry.timestamp.to_rfc3339());
            println!("Image:   {}x{} PNG", img.width(), img.height());
        }
        HistoryAction::Export { index, out } => {
            let entry = history.restore(index)?;
            std::fs::write(&out, datauri::decode_bytes(&entry.qr_image)?)?;
            println!("Saved to {}", out.display());
        }
        HistoryAction::Copy { index } => {
            let entry = history.restore(index)?;
            let img = datauri::decode_image(&entry.qr_image)?.to_rgba8();
            clipboard::copy_image(&img)?;
            println!("Copied to clipboard");
        }
        HistoryAction::Remove { index } => {
            let entry = history.remove(index)?;
            println!("Removed: {}", truncate(&entry.data, 60));
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                return Err(QuickQrError::Validation(
                    "Refusing to clear history without --yes".to_string(),
                ));
            }
            let cleared = history.len();
            history.clear();
            println!("Cleared {} entries", cleared);
        }
    }
    Ok(())
}

fn open_history(data_dir: Option<PathBuf>) -> Result<HistoryStore, QuickQrError> {
    let config = ServerConfig {
        data_dir,
        ..Default::default()
    };
    let dir = config.resolved_data_dir().ok_or_else(|| {
        QuickQrError::Persistence("no data directory; pass --data-dir".to_string())
    })?;
    Ok(HistoryStore::load(Box::new(FileStore::open(dir)?)))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
