//! A simulated project-creation endpoint guarded by an [`AccessGate`],
//! with the background sweeper running alongside.

use gatehouse::{
    caller_key, AccessGate, ActionKind, Decision, LimiterBuilder, LimitsTable, PlanTier,
    QuotaAuthorizer, RateLimitPolicy,
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Request {
    forwarded_for: Option<&'static str>,
    peer: IpAddr,
    user: &'static str,
    tier: PlanTier,
}

fn main() -> gatehouse::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let limiter = Arc::new(LimiterBuilder::from_env().sweep_interval_ms(100).try_build()?);
    let sweeper = limiter.clone().spawn_sweeper()?;

    let gate = AccessGate::new(limiter, QuotaAuthorizer::new(LimitsTable::from_env()?));
    let create_project = RateLimitPolicy::new(500, 4)?;

    // Usage counters live with the caller, not the gate
    let mut projects: HashMap<&str, u64> = HashMap::new();

    let peer = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 10));

    let requests = [
        Request {
            forwarded_for: Some("203.0.113.5"),
            peer,
            user: "alice",
            tier: PlanTier::Free,
        },
        Request {
            forwarded_for: None,
            peer,
            user: "bob",
            tier: PlanTier::Pro,
        },
    ];

    for round in 1..=8 {
        for request in &requests {
            let key = format!(
                "create-project:{}",
                caller_key(request.forwarded_for, Some(request.peer))
            );
            let usage = projects.get(request.user).copied().unwrap_or(0);

            let decision = gate.admit_now(
                &key,
                &create_project,
                request.tier,
                ActionKind::Projects,
                usage,
            );
            match decision {
                Decision::Proceed { remaining, .. } => {
                    *projects.entry(request.user).or_insert(0) += 1;
                    println!(
                        "round {}: {} created project ({} left)",
                        round, request.user, remaining
                    );
                }
                Decision::Throttled(rate) => {
                    println!(
                        "round {}: {} throttled (429), limit {}",
                        round, request.user, rate.limit
                    );
                }
                Decision::QuotaReached(quota) => {
                    println!("round {}: {} blocked (403): {}", round, request.user, quota);
                }
            }
        }

        if round == 4 {
            println!("-- waiting for the window to roll over --");
            thread::sleep(Duration::from_millis(600));
        }
    }

    println!("\n{}", gate.limiter().metrics());
    sweeper.shutdown();
    Ok(())
}
