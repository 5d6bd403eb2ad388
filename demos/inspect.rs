//! Prints header and frame metadata for a GIF file.
//!
//! Grounded on `netvl-immeta`'s `immeta-analyzer` binary: a single
//! required `FILE` argument parsed with `clap`, dispatching into one
//! print function. Not part of the library's public contract — this is
//! an inspection tool, not an API surface.

use std::fs;
use std::io::{self, Write};

#[macro_use]
extern crate clap;
extern crate gifcore;

use clap::{App, AppSettings};

fn main() {
    env_logger::init();

    let matches = App::new("gif-inspect")
        .version(crate_version!())
        .about("Prints header and frame metadata from a GIF file.")
        .setting(AppSettings::ArgRequiredElseHelp)
        .args_from_usage("<FILE> 'Input GIF file'")
        .get_matches();

    let file_name = matches.value_of("FILE").unwrap();

    let bytes = match fs::read(file_name) {
        Ok(b) => b,
        Err(e) => {
            let _ = writeln!(io::stderr(), "cannot read {}: {}", file_name, e);
            std::process::exit(1);
        }
    };

    let header = gifcore::HeaderParser::set_data(&bytes).parse_header();
    print_header(&header);
}

fn print_header(header: &gifcore::Header) {
    println!("GIF image:");
    println!("  Logical screen: {}x{}", header.width, header.height);
    println!("  Global color table: {}", if header.gct.is_some() { "yes" } else { "no" });
    println!("  Status: {:?}", header.status);
    println!(
        "  Loop count: {}",
        if header.loop_count == gifcore::LOOP_FOREVER { "forever".to_string() } else { header.loop_count.to_string() }
    );
    println!("  Frames: {}", header.frames.len());
    for (i, frame) in header.frames.iter().enumerate() {
        println!(
            "    #{}: {}x{} at ({},{}), dispose={:?}, delay={}ms, transparency={}, interlace={}",
            i, frame.iw, frame.ih, frame.ix, frame.iy, frame.dispose, frame.delay_ms, frame.transparency, frame.interlace
        );
    }
}
