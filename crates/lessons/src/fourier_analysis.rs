use std::f64::consts::PI;
use std::sync::Arc;

use lesson_core::{
    CalculationResult, ChartData, Difficulty, Importance, LessonEngine, LessonError, LessonMetadata, LessonModule,
    ParamValue, Parameter, ParameterSet, PhaseDescriptor, QuizQuestion, SelectOption, SeriesPoint, ValueFormat,
};
use lesson_math::spectral::{dft, FrequencyGrid, Spectrum, MAX_SAMPLES};
use series_generator::SeededRng;
use tracing::debug;

use crate::series;

pub const ID: &str = "fourier-analysis";

/// Decomposing a noisy two-tone signal into its frequencies.
pub struct FourierEngine;

struct SignalSpec {
    primary_frequency: f64,
    primary_amplitude: f64,
    secondary_frequency: f64,
    secondary_amplitude: f64,
    noise_level: f64,
    sample_rate: f64,
    samples: usize,
    max_frequency: f64,
}

impl SignalSpec {
    fn from_params(params: &ParameterSet) -> Result<Self, LessonError> {
        let sample_rate = params.require_number("sample_rate")?;
        if sample_rate <= 0.0 {
            return Err(LessonError::Calculation("sample rate must be positive".to_string()));
        }
        let duration = params.require_number("duration")?.max(0.0);
        Ok(Self {
            primary_frequency: params.require_number("primary_frequency")?,
            primary_amplitude: params.require_number("primary_amplitude")?,
            secondary_frequency: params.require_number("secondary_frequency")?,
            secondary_amplitude: params.require_number("secondary_amplitude")?,
            noise_level: params.require_number("noise_level")?,
            sample_rate,
            samples: (sample_rate * duration).round().max(1.0) as usize,
            max_frequency: params.require_number("max_frequency")?,
        })
    }

    fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    fn samples_used(&self) -> usize {
        self.samples.min(MAX_SAMPLES)
    }

    /// Bin spacing that matches the samples actually summed.
    fn resolution(&self) -> f64 {
        self.sample_rate / self.samples_used() as f64
    }

    fn clean(&self, i: usize) -> f64 {
        let t = i as f64 / self.sample_rate;
        self.primary_amplitude * (2.0 * PI * self.primary_frequency * t).sin()
            + self.secondary_amplitude * (2.0 * PI * self.secondary_frequency * t).sin()
    }

    fn grid(&self) -> Result<FrequencyGrid, LessonError> {
        Ok(FrequencyGrid::new(0.0, self.max_frequency.min(self.nyquist()), self.resolution())?)
    }

    fn spectrum(&self, samples: &[f64]) -> Result<Spectrum, LessonError> {
        Ok(dft(samples, self.sample_rate, &self.grid()?))
    }
}

/// Frequency a tone appears at once sampled: folded into `[0, rate / 2]`.
fn aliased(frequency: f64, sample_rate: f64) -> f64 {
    (frequency - sample_rate * (frequency / sample_rate).round()).abs()
}

impl LessonEngine for FourierEngine {
    fn calculate(&self, params: &ParameterSet) -> Result<CalculationResult, LessonError> {
        let spec = SignalSpec::from_params(params)?;
        let clean: Vec<f64> = (0..spec.samples).map(|i| spec.clean(i)).collect();
        let spectrum = spec.spectrum(&clean)?;
        if spectrum.truncated {
            debug!(
                "Spectrum summed {} of {} samples",
                spectrum.samples_used, spec.samples
            );
        }

        let mut result = CalculationResult::new();
        result
            .set_number("nyquist_frequency", spec.nyquist())
            .set_number("samples", spec.samples as f64)
            .set_number("samples_used", spectrum.samples_used as f64)
            .set_flag("truncated", spectrum.truncated)
            .set_number("resolution", spec.resolution())
            .set_number("bins", spectrum.bins.len() as f64)
            .set_number("primary_alias", aliased(spec.primary_frequency, spec.sample_rate))
            .set_number("secondary_alias", aliased(spec.secondary_frequency, spec.sample_rate))
            .set_flag("primary_below_nyquist", spec.primary_frequency < spec.nyquist())
            .set_flag(
                "secondary_below_nyquist",
                spec.secondary_amplitude <= 0.0 || spec.secondary_frequency < spec.nyquist(),
            );
        if let Some(peak) = spectrum.dominant() {
            result
                .set_number("dominant_frequency", peak.frequency)
                .set_number("dominant_magnitude", peak.magnitude);
        }
        Ok(result)
    }

    fn generate(&self, params: &ParameterSet, _result: &CalculationResult, seed: u64) -> Result<ChartData, LessonError> {
        let spec = SignalSpec::from_params(params)?;
        let mut rng = SeededRng::new(seed);

        let mut signal = Vec::with_capacity(spec.samples);
        let mut noisy = Vec::with_capacity(spec.samples);
        for i in 0..spec.samples {
            let clean = spec.clean(i);
            let value = clean + spec.noise_level * rng.next_gaussian();
            noisy.push(value);
            signal.push(SeriesPoint::new(i as f64 / spec.sample_rate, value).with("clean", clean));
        }

        let spectrum = spec.spectrum(&noisy)?;
        let mut chart = ChartData::new();
        chart.insert(series("signal", signal));
        chart.insert(series(
            "spectrum",
            spectrum
                .bins
                .iter()
                .map(|b| SeriesPoint::new(b.frequency, b.magnitude).with("phase", b.phase)),
        ));
        Ok(chart)
    }

    fn is_valid(&self, _params: &ParameterSet, result: &CalculationResult) -> bool {
        result.flag("primary_below_nyquist") == Some(true) && result.flag("secondary_below_nyquist") == Some(true)
    }
}

pub fn module() -> LessonModule {
    let metadata = LessonMetadata::new(ID, "Finding Cycles with the Fourier Transform", "signal-processing", Difficulty::Advanced)
        .with_description("Break a noisy price-like signal into the frequencies it is made of, and see what sampling hides.")
        .with_topics(&["fourier", "spectrum", "cycles", "aliasing"])
        .with_estimated_minutes(25);

    let rates = vec![
        SelectOption::number(32.0, "32 Hz"),
        SelectOption::number(64.0, "64 Hz"),
        SelectOption::number(128.0, "128 Hz"),
    ];

    let schema = vec![
        Parameter::slider("primary_frequency", "Primary Frequency", 1.0, 20.0, 1.0, 5.0)
            .with_unit("Hz")
            .with_format(ValueFormat::Fixed { decimals: 0 })
            .with_category("signal"),
        Parameter::slider("primary_amplitude", "Primary Amplitude", 0.1, 5.0, 0.1, 2.0)
            .with_format(ValueFormat::Fixed { decimals: 1 })
            .with_category("signal"),
        Parameter::slider("secondary_frequency", "Secondary Frequency", 1.0, 40.0, 1.0, 12.0)
            .with_unit("Hz")
            .with_format(ValueFormat::Fixed { decimals: 0 })
            .with_category("signal"),
        Parameter::slider("secondary_amplitude", "Secondary Amplitude", 0.0, 5.0, 0.1, 0.5)
            .with_format(ValueFormat::Fixed { decimals: 1 })
            .with_category("signal"),
        Parameter::slider("noise_level", "Noise", 0.0, 2.0, 0.05, 0.2)
            .with_format(ValueFormat::Fixed { decimals: 2 })
            .with_category("signal")
            .with_importance(Importance::Secondary),
        Parameter::select("sample_rate", "Sample Rate", rates, ParamValue::from(64.0))
            .with_category("sampling")
            .with_importance(Importance::Secondary),
        Parameter::slider("duration", "Duration", 1.0, 16.0, 1.0, 4.0)
            .with_unit("s")
            .with_format(ValueFormat::Integer)
            .with_category("sampling")
            .with_importance(Importance::Advanced),
        Parameter::slider("max_frequency", "Highest Frequency Shown", 5.0, 64.0, 1.0, 32.0)
            .with_unit("Hz")
            .with_format(ValueFormat::Integer)
            .with_category("display")
            .with_importance(Importance::Advanced),
    ];

    let phases = vec![
        PhaseDescriptor::narrative(
            "intro",
            "Signals Are Sums of Waves",
            "Any sampled series can be written as a sum of sine waves. The transform measures how much of \
             each frequency the series contains.",
        ),
        PhaseDescriptor::formula(
            "formula",
            "The Discrete Fourier Transform",
            "X(f) = sum x_n e^(-2 pi i f n / fs)",
            "Correlate the samples with a cosine and a sine at f; the magnitude of X measures that frequency's amplitude.",
        ),
        PhaseDescriptor::chart("signal", "The Signal", &["signal"], None),
        PhaseDescriptor::chart(
            "spectrum",
            "Its Spectrum",
            &["spectrum"],
            Some("Peaks sit at the two tone frequencies; noise spreads evenly across the rest."),
        ),
        PhaseDescriptor::explorer(
            "explore",
            "Retune the Signal",
            &["primary_frequency", "secondary_frequency", "noise_level", "sample_rate"],
        ),
        PhaseDescriptor::quiz(
            "check",
            "Check Your Understanding",
            vec![QuizQuestion::new(
                "Sampling at 64 Hz, what is the highest frequency you can resolve?",
                &["16 Hz", "32 Hz", "64 Hz"],
                1,
            )],
        ),
        PhaseDescriptor::summary(
            "summary",
            "Key Takeaways",
            &[
                "The spectrum shows which cycles dominate a series.",
                "Tones above the Nyquist frequency fold back as aliases.",
                "Longer samples give finer frequency resolution.",
            ],
        ),
    ];

    LessonModule::new(metadata, schema, phases, Arc::new(FourierEngine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn defaults() -> ParameterSet {
        module().default_parameters
    }

    #[test]
    fn test_clean_spectrum_finds_primary_tone() {
        let result = FourierEngine.calculate(&defaults()).unwrap();
        assert_eq!(result.number("dominant_frequency"), Some(5.0));
        assert_relative_eq!(result.number("dominant_magnitude").unwrap(), 2.0, epsilon = 1e-9);
        assert_eq!(result.flag("truncated"), Some(false));
        assert!(FourierEngine.is_valid(&defaults(), &result));
    }

    #[test]
    fn test_long_signal_reports_truncation() {
        let params = defaults().with("sample_rate", 128.0).with("duration", 16.0);
        let result = FourierEngine.calculate(&params).unwrap();
        assert_eq!(result.flag("truncated"), Some(true));
        assert_eq!(result.number("samples"), Some(2048.0));
        assert_eq!(result.number("samples_used"), Some(MAX_SAMPLES as f64));
    }

    #[test]
    fn test_tone_above_nyquist_is_invalid() {
        let params = defaults().with("sample_rate", 32.0).with("secondary_frequency", 20.0);
        let result = FourierEngine.calculate(&params).unwrap();
        assert!(!FourierEngine.is_valid(&params, &result));
        assert_eq!(result.number("secondary_alias"), Some(12.0));
    }

    #[test]
    fn test_silent_secondary_does_not_matter() {
        let params = defaults()
            .with("sample_rate", 32.0)
            .with("secondary_frequency", 30.0)
            .with("secondary_amplitude", 0.0);
        let result = FourierEngine.calculate(&params).unwrap();
        assert!(FourierEngine.is_valid(&params, &result));
    }

    #[test]
    fn test_noisy_signal_keeps_clean_copy() {
        let params = defaults();
        let result = FourierEngine.calculate(&params).unwrap();
        let chart = FourierEngine.generate(&params, &result, 5).unwrap();
        let signal = chart.get("signal").unwrap();
        assert_eq!(signal.len(), 256);
        assert!(signal.points.iter().all(|p| p.field("clean").is_some()));
        assert!(chart.check().is_ok());
    }
}
