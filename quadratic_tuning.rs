use yellowfin::config::load_config;
use yellowfin::YellowFin;

// Synthetic convex quadratic: loss = 0.5 * sum(h_i * (w_i - target_i)^2),
// so the exact gradient is h_i * (w_i - target_i). Small demo to watch the
// tuner settle without any neural-network machinery.
const DIM: usize = 16;
const STEPS: usize = 400;
const REPORT_EVERY: usize = 20;

fn gradient(weight: &[f32], target: &[f32], curvature: &[f32], grad: &mut [f32]) {
    for i in 0..weight.len() {
        grad[i] = curvature[i] * (weight[i] - target[i]);
    }
}

fn loss(weight: &[f32], target: &[f32], curvature: &[f32]) -> f32 {
    weight
        .iter()
        .zip(target.iter())
        .zip(curvature.iter())
        .map(|((w, t), h)| 0.5 * h * (w - t) * (w - t))
        .sum()
}

fn main() {
    let config = match load_config("config/quadratic.json") {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config/quadratic.json: {err}");
            std::process::exit(1);
        }
    };
    let mut optimizer = match YellowFin::new(config) {
        Ok(optimizer) => optimizer,
        Err(err) => {
            eprintln!("rejected optimizer configuration: {err}");
            std::process::exit(1);
        }
    };

    // Mildly ill-conditioned problem: per-coordinate curvatures spread
    // between 0.5 and 8.0.
    let curvature: Vec<f32> = (0..DIM)
        .map(|i| 0.5 + 7.5 * (i as f32) / (DIM as f32 - 1.0))
        .collect();
    let target = vec![1.0f32; DIM];
    let mut weight = vec![0.0f32; DIM];
    let mut grad = vec![0.0f32; DIM];

    println!("step      loss          lr            momentum");
    for step in 1..=STEPS {
        gradient(&weight, &target, &curvature, &mut grad);
        if let Err(err) = optimizer.update(0, &mut weight, &grad) {
            eprintln!("tuning failed at step {step}: {err}");
            std::process::exit(1);
        }

        if step % REPORT_EVERY == 0 {
            println!(
                "{:>4}  {:>12.6e}  {:>12.6e}  {:>10.6}",
                step,
                loss(&weight, &target, &curvature),
                optimizer.lr_multiplier(),
                optimizer.momentum_scalar()
            );
        }
    }

    let final_loss = loss(&weight, &target, &curvature);
    println!("final loss after {STEPS} steps: {final_loss:.6e}");
}
