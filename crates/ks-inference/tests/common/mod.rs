//! Seeded synthetic datasets shared by the integration tests.

#![allow(dead_code)]

use ks_core::Dataset;
use ks_graph::AssumptionGraph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

fn normal(rng: &mut StdRng) -> f64 {
    StandardNormal.sample(rng)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// ability -> {education, income}, proximity -> education, education -> income.
pub fn schooling_graph() -> AssumptionGraph {
    AssumptionGraph::from_declarations([
        ("ability", vec!["education", "income"]),
        ("proximity", vec!["education"]),
        ("education", vec!["income"]),
    ])
    .unwrap()
}

/// income = 20 + 2 education + 3 ability + noise,
/// education = 12 + `strength` proximity + 1.5 ability + noise.
pub fn schooling_data(n: usize, strength: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut ability, mut proximity, mut education, mut income) =
        (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let a = normal(&mut rng);
        let z = normal(&mut rng);
        let e = 12.0 + strength * z + 1.5 * a + normal(&mut rng);
        let y = 20.0 + 2.0 * e + 3.0 * a + 2.0 * normal(&mut rng);
        ability.push(a);
        proximity.push(z);
        education.push(e);
        income.push(y);
    }
    Dataset::new([("ability", ability), ("proximity", proximity), ("education", education), ("income", income)])
        .unwrap()
}

/// Randomized binary treatment: y = 1 + `effect` t + noise.
pub fn trial_data(n: usize, effect: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let t: Vec<f64> = (0..n).map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 }).collect();
    let y: Vec<f64> = t.iter().map(|&ti| 1.0 + effect * ti + normal(&mut rng)).collect();
    Dataset::new([("treated", t), ("outcome", y)]).unwrap()
}

/// Confounded binary treatment: P(t=1) = sigmoid(0.8 c), y = 1 + `effect` t + 1.5 c + noise.
pub fn observational_data(n: usize, effect: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut c, mut t, mut y) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let ci = normal(&mut rng);
        let ti = if rng.gen_bool(sigmoid(0.8 * ci)) { 1.0 } else { 0.0 };
        c.push(ci);
        t.push(ti);
        y.push(1.0 + effect * ti + 1.5 * ci + normal(&mut rng));
    }
    Dataset::new([("c", c), ("t", t), ("y", y)]).unwrap()
}

/// Two groups by two periods: y = 5 + g + 0.5 post + `att` g post + noise.
pub fn panel_data(n: usize, att: f64, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut g, mut p, mut y) = (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
    for _ in 0..n {
        let gi = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
        let pi = if rng.gen_bool(0.5) { 1.0 } else { 0.0 };
        g.push(gi);
        p.push(pi);
        y.push(5.0 + gi + 0.5 * pi + att * gi * pi + normal(&mut rng));
    }
    Dataset::new([("treated_group", g), ("post", p), ("sales", y)]).unwrap()
}
