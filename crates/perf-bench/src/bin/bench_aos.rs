use std::hint::black_box;
use std::time::Instant;

use common::moments::MomentAccumulator;
use perf_bench::*;

fn main() {
    let contributions = generate_benchmark_contributions();
    let mut moments: MomentsAOS = vec![MomentAccumulator::new(); NUM_BINS];

    let start_time = Instant::now();

    // Each update touches all four moments of one bin, which share a cache line.
    for c in &contributions {
        moments[c.bin].add(c.value);
    }

    let elapsed_time = start_time.elapsed();

    let final_checksum = black_box(checksum(
        moments.iter().map(|m| m.first()),
        moments.iter().map(|m| m.fourth()),
    ));

    println!(
        "--- AoS Benchmark Results ({} Contributions, {} Bins) ---",
        NUM_CONTRIBUTIONS, NUM_BINS
    );
    println!("Checksum: {:.10}", final_checksum);
    println!("Elapsed Time: {:?}", elapsed_time);
}
