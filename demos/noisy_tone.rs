use butter_rs::prelude::*;
use rand::distributions::Uniform;
use rand::Rng;
use std::f64::consts::PI;
use std::time::Instant;

fn rms(samples: &[f64]) -> f64 {
    (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
}

/// An example that buries a 440 Hz tone in uniform noise, then pulls it back
/// out with a band pass filter and a streaming low pass filter.
fn main() {
    env_logger::init();

    let fs = 8000.0;
    let mut rng = rand::thread_rng();
    let dist = Uniform::new(-1.0_f64, 1.0);
    let tone: Vec<f64> = (0..16000)
        .map(|n| (2.0 * PI * 440.0 * n as f64 / fs).sin())
        .collect();
    let noisy: Vec<f64> = tone.iter().map(|x| x + rng.sample(&dist)).collect();

    let butter = Butterworth::new(fs).unwrap();
    let now = Instant::now();
    let band = butter.band_pass(&noisy, 4, 400.0, 480.0).unwrap();
    println!("band pass took {:?}", now.elapsed());

    let skip = 4000;
    let noise: Vec<f64> = noisy
        .iter()
        .zip(tone.iter())
        .map(|(y, x)| y - x)
        .collect();
    println!("tone rms: {:.4}", rms(&tone[skip..]));
    println!("noise rms: {:.4}", rms(&noise[skip..]));
    println!("band pass output rms: {:.4}", rms(&band[skip..]));

    let mut stream = butter
        .stream(6, BandShape::LowPass { cutoff: 600.0 })
        .unwrap();
    let mut peak: f64 = 0.0;
    for chunk in noisy.chunks(512) {
        let out = stream.process(chunk);
        peak = out.iter().fold(peak, |acc, y| acc.max(y.abs()));
    }
    println!("streaming low pass peak: {:.4}", peak);
    for (i, section) in stream.cascade().sections().iter().enumerate() {
        println!("section {}: {:?}", i, section);
    }
}
