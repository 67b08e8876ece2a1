use std::hint::black_box;
use std::time::Instant;

use perf_bench::*;

fn main() {
    let contributions = generate_benchmark_contributions();
    let mut moments = MomentColumns::new(NUM_BINS);

    let start_time = Instant::now();

    // Each update writes to four separate columns.
    for c in &contributions {
        moments.add(c.bin, c.value);
    }

    let elapsed_time = start_time.elapsed();

    let final_checksum = black_box(checksum(
        moments.first.iter().copied(),
        moments.fourth.iter().copied(),
    ));

    println!(
        "--- SoA Benchmark Results ({} Contributions, {} Bins) ---",
        NUM_CONTRIBUTIONS, NUM_BINS
    );
    println!("Checksum: {:.10}", final_checksum);
    println!("Elapsed Time: {:?}", elapsed_time);
}
