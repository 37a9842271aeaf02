use clap::Parser;
use log::info;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

use jp2::{decode_jp2, JP2Error};
use jpc::{decode_jpc, CodestreamError, ContiguousCodestream, RandomAccessReader};

#[derive(Debug, Error)]
enum JP2000Error {
    #[error("error reading {path}: {error}")]
    Reading {
        path: String,
        error: CodestreamError,
    },

    #[error("error decoding jp2 container {error}")]
    DecodingContainer { error: JP2Error },

    #[error("error decoding jpc codestream {error}")]
    DecodingCodestream { error: CodestreamError },
}

#[derive(Parser)]
#[clap(version, about = "Inspect the headers of JPEG 2000 files")]
struct Opts {
    #[clap(subcommand)]
    subcommand: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    /// Decode the headers of a .jp2 file or raw codestream and log a summary
    Decode(Decode),

    /// Print every header marker segment of a .jp2 file or raw codestream (stdout)
    Dump(Dump),
}

#[derive(Parser)]
struct Decode {
    /// Path to .jp2, .jpc or .j2c file
    path: String,
}

#[derive(Parser)]
struct Dump {
    /// Path to .jp2, .jpc or .j2c file
    path: String,
}

// The wrapper is detected from the content, not the extension.
fn decode(path: &Path) -> Result<ContiguousCodestream, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = RandomAccessReader::new(file).map_err(|error| JP2000Error::Reading {
        path: path.display().to_string(),
        error,
    })?;

    let jp2 = decode_jp2(&mut reader).map_err(|error| JP2000Error::DecodingContainer { error })?;
    reader
        .seek(jp2.codestream_offset())
        .map_err(|error| JP2000Error::DecodingCodestream { error })?;
    let codestream =
        decode_jpc(&mut reader).map_err(|error| JP2000Error::DecodingCodestream { error })?;

    jp2.verify_image_header(codestream.header().image_and_tile_size_marker_segment());
    Ok(codestream)
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let opts: Opts = Opts::parse();

    match opts.subcommand {
        SubCommand::Decode(c) => {
            let codestream = decode(Path::new(&c.path))?;
            let header = codestream.header();
            let siz = header.image_and_tile_size_marker_segment();
            info!(
                "{}: {}x{}, {} components, {} tiles, {} tile-parts, codestream at {}",
                c.path,
                siz.image_width(),
                siz.image_height(),
                siz.no_components(),
                siz.num_tiles(),
                header.info().tile_parts().len(),
                codestream.offset()
            );
        }
        SubCommand::Dump(c) => {
            let codestream = decode(Path::new(&c.path))?;
            print!("{}", codestream.header());
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
