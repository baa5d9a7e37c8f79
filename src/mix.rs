//! Bus processing: send-gain accumulation from patch stems into bus buffers,
//! the feedback-delay-line processor shared by `reverb_algo`/`delay`, and
//! master-bus summation with soft clipping.

use crate::program::BusProgram;

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Accumulates `amount_db` of `patch_stem` into `bus_stem`, in place.
pub fn accumulate_send(bus_stem: &mut [f32], patch_stem: &[f32], amount_db: f64) {
    let gain = db_to_linear(amount_db) as f32;
    for (b, p) in bus_stem.iter_mut().zip(patch_stem.iter()) {
        *b += p * gain;
    }
}

/// Runs a bus's feedback-delay-line processor over `stem` in place: a single
/// tap whose feedback is derived from `decay` (seconds to -60dB) and whose
/// wet/dry balance is `mix`. Serves both `reverb_algo` and `delay` node
/// types (see DESIGN.md).
pub fn process_bus_stem(stem: &mut [f32], program: &BusProgram, sample_rate: u32) {
    if !program.has_reverb || stem.is_empty() {
        return;
    }
    let delay_samples = ((program.predelay_seconds * f64::from(sample_rate)).round() as usize).max(1);
    let feedback = (-6.91 * program.predelay_seconds.max(0.001) / program.decay.max(0.1))
        .exp()
        .clamp(0.05, 0.98);

    let mut line = vec![0.0_f32; delay_samples];
    let mut write_pos = 0usize;
    let mix = program.mix.clamp(0.0, 1.0) as f32;
    let dry = 1.0 - mix;

    for sample in stem.iter_mut() {
        let tapped = line[write_pos];
        let input = *sample;
        line[write_pos] = input + tapped * feedback as f32;
        write_pos = (write_pos + 1) % delay_samples;
        *sample = input * dry + tapped * mix;
    }
}

/// Sums `patches` and `buses` sample-by-sample into a master buffer of
/// length `total_samples`, then applies a `tanh` soft clip.
pub fn mix_master(patches: &[&[f32]], buses: &[&[f32]], total_samples: usize) -> Vec<f32> {
    let mut master = vec![0.0_f32; total_samples];
    for stem in patches.iter().chain(buses.iter()) {
        for (m, s) in master.iter_mut().zip(stem.iter()) {
            *m += *s;
        }
    }
    for sample in master.iter_mut() {
        *sample = sample.tanh();
    }
    master
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_send_scales_by_db() {
        let mut bus = vec![0.0f32; 4];
        let patch = vec![1.0f32; 4];
        accumulate_send(&mut bus, &patch, 0.0);
        assert!((bus[0] - 1.0).abs() < 1e-6);
        accumulate_send(&mut bus, &patch, -6.0);
        assert!(bus[0] > 1.0 && bus[0] < 2.0);
    }

    #[test]
    fn process_bus_stem_noop_when_no_reverb() {
        let mut stem = vec![1.0f32; 10];
        let program = BusProgram {
            has_reverb: false,
            ..BusProgram::default()
        };
        let before = stem.clone();
        process_bus_stem(&mut stem, &program, 48000);
        assert_eq!(stem, before);
    }

    #[test]
    fn process_bus_stem_preserves_length_and_bounds() {
        let mut stem = vec![1.0f32; 4800];
        let program = BusProgram {
            has_reverb: true,
            mix: 0.5,
            decay: 2.0,
            predelay_seconds: 0.02,
        };
        process_bus_stem(&mut stem, &program, 48000);
        assert_eq!(stem.len(), 4800);
        assert!(stem.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn mix_master_soft_clips_loud_sum() {
        let stem = vec![10.0f32; 4];
        let patches: Vec<&[f32]> = vec![&stem];
        let master = mix_master(&patches, &[], 4);
        assert!(master.iter().all(|s| s.abs() <= 1.0));
    }
}
