#![allow(dead_code)]

use clap::{Parser, Subcommand};
use std::error;
use std::error::Error;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use isf::Drawing;

#[derive(Debug)]
enum InktoolError {
    UnsupportedExtension { extension: String },
    ParseFailed { error: isf::IsfError },
}

impl error::Error for InktoolError {}
impl fmt::Display for InktoolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedExtension { extension } => {
                write!(f, "unsupported extension {:?}", extension)
            }
            Self::ParseFailed { error } => {
                write!(f, "could not parse the ink stream: {}", error)
            }
        }
    }
}

#[derive(Parser)]
struct Opts {
    #[command(subcommand)]
    subcommand: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Decode an ink file and print a summary of its contents.
    Info { input: PathBuf },

    /// Extract the raw ISF payload of a fortified image.
    Extract {
        input: PathBuf,

        /// Write the payload here instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn load_drawing(path: &Path) -> Result<Drawing, Box<dyn Error>> {
    let data = fs::read(path)?;

    let drawing = match extension_of(path).as_str() {
        "isf" => isf::decode(&data),
        "gif" => fortified::decode_gif(&data)?,
        "png" => fortified::decode_png(&data)?,
        extension => {
            return Err(InktoolError::UnsupportedExtension {
                extension: extension.to_owned(),
            }
            .into());
        }
    };

    if let Some(error) = drawing.error() {
        return Err(InktoolError::ParseFailed { error }.into());
    }

    Ok(drawing)
}

fn print_info(drawing: &Drawing) {
    println!("strokes:          {}", drawing.strokes().len());
    println!("attribute sets:   {}", drawing.attribute_sets().len());
    println!("metric tables:    {}", drawing.metrics_tables().len());
    println!("transformations:  {}", drawing.transforms().len());
    println!("registered guids: {}", drawing.guids().len());

    let points: usize = drawing
        .strokes()
        .iter()
        .map(|stroke| stroke.points().len())
        .sum();
    println!("total points:     {}", points);

    if let Some((width, height)) = drawing.himetric_size() {
        println!("declared size:    {}x{} himetric", width, height);
    }

    let rect = drawing.bounding_rect();
    println!(
        "bounding rect:    {:.1},{:.1} to {:.1},{:.1}",
        rect.left, rect.top, rect.right, rect.bottom
    );

    let pen = drawing.max_pen_size();
    println!("max pen size:     {:.2}x{:.2} px", pen.width, pen.height);
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();

    match opts.subcommand {
        SubCommand::Info { input } => {
            let drawing = load_drawing(&input)?;
            print_info(&drawing);
        }

        SubCommand::Extract { input, output } => {
            let data = fs::read(&input)?;

            let payload = match extension_of(&input).as_str() {
                "gif" => fortified::extract_isf_from_gif(&data)?,
                "png" => fortified::extract_isf_from_png(&data)?,
                "isf" => data,
                extension => {
                    return Err(InktoolError::UnsupportedExtension {
                        extension: extension.to_owned(),
                    }
                    .into());
                }
            };

            match output {
                Some(path) => fs::write(path, payload)?,
                None => io::stdout().write_all(&payload)?,
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match run() {
        Err(e) => Err(e.to_string().into()),
        Ok(_) => Ok(()),
    }
}
