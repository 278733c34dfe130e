//! Writes in-memory recordings as EDF+ files

use ecog_core::{config_error, EcogError, EcogResult, MemoryRecording, RecordingSource};
use edfplus::{EdfWriter, SignalParam};
use std::path::Path;

/// Write `recording` to `path` with one-second data records.
///
/// Each channel's physical range is its data range widened to whole units,
/// so values round-trip up to 16-bit quantisation. A trailing partial record
/// is zero-padded.
pub fn write_edf(path: impl AsRef<Path>, recording: &MemoryRecording) -> EcogResult<()> {
    let path = path.as_ref();
    let rate = recording.sampling_rate();
    if rate.fract() != 0.0 {
        return Err(config_error!("EDF records of one second need an integral rate, got {}Hz", rate));
    }
    let samples_per_record = rate as usize;
    let n = recording.sample_count();
    let records = n.div_ceil(samples_per_record);

    let mut writer = EdfWriter::create(path).map_err(edf_error(path))?;
    let start = recording.start_time();
    writer
        .set_start_datetime(start.date(), start.time())
        .map_err(edf_error(path))?;

    let mut channels = Vec::with_capacity(recording.channel_names().len());
    for (index, name) in recording.channel_names().iter().enumerate() {
        let data = recording.channel_data(index)?;
        let (min, max) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        let (min, max) = if min.is_finite() && max > min {
            (min.floor(), max.ceil())
        } else {
            let centre = if min.is_finite() { min.round() } else { 0.0 };
            (centre - 1.0, centre + 1.0)
        };
        writer
            .add_signal(SignalParam {
                label: name.clone(),
                samples_in_file: 0,
                physical_max: max,
                physical_min: min,
                digital_max: i16::MAX as i32,
                digital_min: i16::MIN as i32,
                samples_per_record: samples_per_record.try_into().map_err(|_| {
                    config_error!("{} samples per record do not fit an EDF header", samples_per_record)
                })?,
                physical_dimension: "uV".to_string(),
                prefilter: String::new(),
                transducer: String::new(),
            })
            .map_err(edf_error(path))?;
        channels.push(data);
    }

    for r in 0..records {
        let record: Vec<Vec<f64>> = channels
            .iter()
            .map(|data| {
                (r * samples_per_record..(r + 1) * samples_per_record)
                    .map(|i| data.get(i).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();
        writer.write_samples(&record).map_err(edf_error(path))?;
    }
    writer.finalize().map_err(edf_error(path))
}

fn edf_error<E: std::fmt::Display>(path: &Path) -> impl Fn(E) -> EcogError + '_ {
    move |e| EcogError::format(path, e.to_string())
}
