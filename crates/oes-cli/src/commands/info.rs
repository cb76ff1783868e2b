use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use oes_core::classify::classify;
use oes_core::frame::FrameMetadata;
use oes_core::io::fits::FitsReader;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let reader = FitsReader::open(&args.file)?;
    let metadata = FrameMetadata::from_header(&reader.header);

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", reader.width(), reader.height());
    println!("BITPIX:      {}", reader.bitpix());
    println!("Cards:       {}", reader.header.cards().len());

    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    println!("IMAGETYP:    {}", field(&metadata.image_type));
    println!("OBJECT:      {}", field(&metadata.object));
    println!("DATE-OBS:    {}", field(&metadata.date_obs));
    println!("UT:          {}", field(&metadata.ut));

    match classify(&args.file, &metadata) {
        Ok(image_type) => println!("Class:       {image_type}"),
        Err(e) => println!("Class:       unrecognized ({e})"),
    }

    let total_kb = reader.data_byte_size() as f64 / 1024.0;
    println!("Data size:   {:.1} KB", total_kb);

    Ok(())
}
