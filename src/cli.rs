use clap::Parser;
use std::path::PathBuf;

use crate::core::presets::{FrameSize, FRAME_SIZE_PRESETS};

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Decoder: image 0.25 (PNG, JPEG, TIFF, BMP)\n",
    "Target:  ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Frame-accurate comparison of two image sequences
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Glob pattern of the first sequence (e.g. "renders/a/*.png")
    #[arg(value_name = "SEQ_A", required_unless_present = "list_sizes")]
    pub sequence_a: Option<String>,

    /// Glob pattern of the second sequence
    #[arg(value_name = "SEQ_B", required_unless_present = "list_sizes")]
    pub sequence_b: Option<String>,

    /// Frame size: preset name (QCIF, CIF, 1080i/p, ...) or WxH. Default: size of the first file
    #[arg(short = 's', long = "size", value_name = "SIZE", value_parser = parse_size)]
    pub size: Option<FrameSize>,

    /// Compare only the first N frames
    #[arg(short = 'n', long = "frames", value_name = "N")]
    pub frames: Option<usize>,

    /// Difference amplification factor (overrides settings)
    #[arg(short = 'a', long = "amplify", value_name = "N")]
    pub amplify: Option<i32>,

    /// Binary difference mask instead of re-centred difference
    #[arg(short = 'm', long = "mark")]
    pub mark: bool,

    /// Write difference images as PNG into this directory
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Decode both sequences into the cache on worker threads before comparing
    #[arg(long = "cache-ahead")]
    pub cache_ahead: bool,

    /// Print available frame size presets and exit
    #[arg(long = "list-sizes")]
    pub list_sizes: bool,

    /// Enable debug logging to file (default: framecmp.log in the config dir)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

fn parse_size(s: &str) -> Result<FrameSize, String> {
    FRAME_SIZE_PRESETS
        .find_by_name(s)
        .or_else(|| FrameSize::parse(s))
        .ok_or_else(|| format!("'{}' is neither a preset name nor WxH", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "framecmp", "a/*.png", "b/*.png", "--size", "CIF", "-a", "4", "-m", "-vv",
        ])
        .unwrap();
        assert_eq!(args.size, Some(FrameSize::new(352, 288)));
        assert_eq!(args.amplify, Some(4));
        assert!(args.mark);
        assert_eq!(args.verbosity, 2);
        assert!(args.log_file.is_none());
        assert_eq!(args.sequence_b.as_deref(), Some("b/*.png"));
    }

    #[test]
    fn test_list_sizes_needs_no_sequences() {
        let args = Args::try_parse_from(["framecmp", "--list-sizes"]).unwrap();
        assert!(args.list_sizes);
        assert!(Args::try_parse_from(["framecmp", "only_a"]).is_err());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("64x32"), Ok(FrameSize::new(64, 32)));
        assert!(parse_size("huge").is_err());
    }
}
