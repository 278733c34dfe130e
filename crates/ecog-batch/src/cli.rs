//! Command line arguments of `ecog-features`

use clap::Parser;
use std::path::PathBuf;

/// Extract labeled spectral features from a directory of ECoG recordings
#[derive(Debug, Clone, Parser)]
#[command(name = "ecog-features")]
#[command(version)]
#[command(about = "Windowed PSD feature extraction for ECoG recordings", long_about = None)]
pub struct Args {
    /// Root directory searched recursively for recordings
    #[arg(short = 'e', long = "edf")]
    pub edf_dir: PathBuf,

    /// Label of the computer running the batch
    #[arg(short = 'c', long = "computer")]
    pub computer: String,

    /// Annotation dictionary (JSON keyed by session id)
    #[arg(short = 'a', long = "au")]
    pub annotations: PathBuf,

    /// Classifier that produced the real-time predictions
    #[arg(long = "cl")]
    pub classifier: PathBuf,

    /// Real-time prediction file
    #[arg(long = "rf")]
    pub realtime_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_flags_parse() {
        let args = Args::try_parse_from([
            "ecog-features",
            "-e",
            "/data/edf",
            "-c",
            "lab-3",
            "--au",
            "dict.json",
            "--cl",
            "model.pkl",
            "--rf",
            "realtime.json",
        ])
        .unwrap();

        assert_eq!(args.edf_dir, PathBuf::from("/data/edf"));
        assert_eq!(args.computer, "lab-3");
        assert_eq!(args.annotations, PathBuf::from("dict.json"));
        assert_eq!(args.classifier, PathBuf::from("model.pkl"));
        assert_eq!(args.realtime_file, PathBuf::from("realtime.json"));
    }

    #[test]
    fn test_short_annotation_flag() {
        let args = Args::try_parse_from([
            "ecog-features", "-e", "d", "-c", "x", "-a", "a.json", "--cl", "m", "--rf", "r",
        ])
        .unwrap();
        assert_eq!(args.annotations, PathBuf::from("a.json"));
    }

    #[test]
    fn test_missing_required_flag_rejected() {
        assert!(Args::try_parse_from(["ecog-features", "-e", "d", "-c", "x"]).is_err());
    }
}
