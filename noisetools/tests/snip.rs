use noisetools::snip::{self, SnipParams};
use noisetools::{NoiseError, Stage};

mod common;

fn linear() -> SnipParams {
    SnipParams { apply_lls: false, ..SnipParams::default() }
}

fn spiky(len: usize) -> Vec<f64> {
    let mut s = vec![1.0; len];
    s[50] = 1000.0;
    s[300] = 500.0;
    // Triangle on top of the baseline
    for k in 0..=10 {
        s[600 + k] = 1.0 + 10.0 * k as f64;
        s[620 - k] = 1.0 + 10.0 * k as f64;
    }
    s
}

#[test]
fn lls_inverts() {
    for x in [0.0, 1.0, 17.5, 3.2e4, 1e9] {
        common::assert_close(snip::inverse_lls(snip::lls(x)), x, 1e-9);
    }
}

#[test]
fn defaults() {
    let p = SnipParams::default();
    assert_eq!(p.iterations, 20);
    assert!(p.apply_lls);
    assert_eq!(p.protect_range, 100);
    assert_eq!(p.protect_iterations, 5);
}

#[test]
fn flat_spectrum_is_its_own_background() {
    let flat = vec![42.0; 500];
    let bg = snip::background(&flat, &linear()).unwrap();
    assert_eq!(bg, flat);
    let bg = snip::background(&flat, &SnipParams::default()).unwrap();
    for b in bg {
        common::assert_close(b, 42.0, 1e-9);
    }
}

#[test]
fn zero_iterations_leave_spectrum() {
    let s = spiky(1000);
    let p = SnipParams { iterations: 0, ..SnipParams::default() };
    let bg = snip::background(&s, &p).unwrap();
    for (b, x) in bg.iter().zip(s.iter()) {
        common::assert_close(*b, *x, 1e-9);
    }
}

#[test]
fn background_stays_below_spectrum() {
    let s = spiky(1000);
    for params in [linear(), SnipParams::default()] {
        let bg = snip::background(&s, &params).unwrap();
        assert_eq!(bg.len(), s.len());
        for (b, x) in bg.iter().zip(s.iter()) {
            assert!(*b <= *x * (1.0 + 1e-9), "{} above {}", b, x);
        }
        // Peaks are clipped down to the baseline
        assert!(bg[50] < 1.0 + 1e-6);
        assert!(bg[300] < 1.0 + 1e-6);
        assert!(bg[610] < 50.0);
    }
}

#[test]
fn more_iterations_clip_more() {
    let s = spiky(1000);
    let mut previous = s.clone();
    for iterations in 1..=25 {
        let p = SnipParams { iterations, apply_lls: false, ..SnipParams::default() };
        let bg = snip::background(&s, &p).unwrap();
        for (b, q) in bg.iter().zip(previous.iter()) {
            assert!(*b <= *q);
        }
        previous = bg;
    }
}

#[test]
fn first_bin_is_untouched() {
    let mut s = vec![1.0; 200];
    s[0] = 1e5;
    let bg = snip::background(&s, &SnipParams::default()).unwrap();
    common::assert_close(bg[0], 1e5, 1e-9);
    let bg = snip::background(&s, &linear()).unwrap();
    assert_eq!(bg[0], 1e5);
}

#[test]
fn out_of_domain() {
    let mut s = vec![1.0; 10];
    s[3] = -2.0;
    assert!(matches!(
        snip::background(&s, &SnipParams::default()),
        Err(NoiseError::InvalidInput { stage: Stage::Background, .. })
    ));
    // Without the transform negative values are fine
    assert!(snip::background(&s, &linear()).is_ok());
    s[3] = f64::NAN;
    assert!(matches!(
        snip::background(&s, &linear()),
        Err(NoiseError::InvalidInput { stage: Stage::Background, .. })
    ));
}

#[test]
fn empty_spectrum() {
    let bg = snip::background(&[], &SnipParams::default()).unwrap();
    assert!(bg.is_empty());
}

/// Flat-topped peak of 100 over bins 30..=70, well below the protected range
fn plateau() -> Vec<f64> {
    let mut s = vec![1.0; 500];
    s[30..=70].iter_mut().for_each(|x| *x = 100.0);
    s
}

#[test]
fn protected_range_keeps_wide_low_peaks() {
    let s = plateau();
    let bg = snip::background(&s, &linear()).unwrap();
    // The first passes only erode the edges
    assert!(bg[30] < 100.0);
    assert_eq!(bg[50], 100.0);

    let open = SnipParams { protect_range: 0, ..linear() };
    let bg = snip::background(&s, &open).unwrap();
    assert!(bg[50] < 60.0, "bin 50 kept {}", bg[50]);
}

#[test]
fn protect_iterations_moves_the_switch() {
    let s = plateau();
    let default = snip::background(&s, &linear()).unwrap();

    // The pass number sets the window throughout
    let never = SnipParams { protect_iterations: 25, ..linear() };
    let bg = snip::background(&s, &never).unwrap();
    assert!(bg[50] < 60.0, "bin 50 kept {}", bg[50]);
    assert_ne!(bg, default);

    // The protected range holds from the first pass
    let always = SnipParams { protect_iterations: 0, ..linear() };
    let bg = snip::background(&s, &always).unwrap();
    assert_eq!(&bg[..100], &s[..100]);
    assert_ne!(bg, default);
}
