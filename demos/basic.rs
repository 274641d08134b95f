//! Basic usage example for the gatehouse crate.

use gatehouse::{
    ActionKind, FixedWindowLimiter, LimitsTable, PlanTier, QuotaAuthorizer, RateLimitPolicy,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    println!("=== Basic Gatehouse Example ===\n");

    // Example 1: One window, counted down
    window_example();

    println!("\n{}\n", "=".repeat(50));

    // Example 2: Window rollover
    rollover_example();

    println!("\n{}\n", "=".repeat(50));

    // Example 3: Plan quotas
    quota_example();

    println!("\n{}\n", "=".repeat(50));

    // Example 4: Metrics
    metrics_example();
}

fn window_example() {
    println!("1. Sign-in limit, 5 per minute:");

    let limiter = FixedWindowLimiter::new();
    let policy = RateLimitPolicy::per_minute(5).expect("valid policy");

    for i in 1..=7 {
        let result = limiter.check("1.2.3.4", &policy, 1_000);
        if result.admitted {
            println!("   Attempt {} - ✅ Allowed ({} left)", i, result.remaining);
        } else {
            println!(
                "   Attempt {} - ❌ Rate limited, retry in {}s",
                i,
                result.retry_after_secs(1_000)
            );
        }
    }
}

fn rollover_example() {
    println!("2. Window rollover:");

    let limiter = FixedWindowLimiter::new();
    let policy = RateLimitPolicy::new(10_000, 2).expect("valid policy");

    for now in [0, 5_000, 9_999, 10_000] {
        let result = limiter.check("5.6.7.8", &policy, now);
        println!(
            "   t={:>6}ms admitted={} remaining={} reset_at={}",
            now, result.admitted, result.remaining, result.reset_at
        );
    }
}

fn quota_example() {
    println!("3. Plan quotas:");

    let quota = QuotaAuthorizer::new(LimitsTable::builtin());

    for tier in PlanTier::ALL {
        for action in [ActionKind::Projects, ActionKind::HighResExport] {
            let decision = quota.check(tier, action, 5);
            println!("   {}", decision);
        }
    }
}

fn metrics_example() {
    println!("4. Metrics:");

    let limiter = FixedWindowLimiter::new();
    let policy = RateLimitPolicy::per_second(3).expect("valid policy");

    for i in 0..20 {
        limiter.check(&format!("10.0.0.{}", i % 4), &policy, 0);
    }

    let metrics = limiter.metrics();
    println!("{}", metrics);
    println!("   Suggested: {}", metrics.health_status().suggested_action());
}
