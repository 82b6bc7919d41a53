//! Host load sampling for cluster reports.

use anyhow::Result;

use medley_core::load::SystemLoad;

/// Collect a sample of host load, both values normalized to `0..=1`.
#[cfg(not(target_os = "linux"))]
pub fn sample() -> Result<SystemLoad> {
    // No procfs off Linux; report an idle host rather than nothing, so the
    // agent still participates in the cluster view.
    Ok(SystemLoad { cpu: 0.0, mem: 0.0 })
}

/// Collect a sample of host load, both values normalized to `0..=1`.
#[cfg(target_os = "linux")]
pub fn sample() -> Result<SystemLoad> {
    use anyhow::Context;

    let loadavg = procfs::LoadAverage::new().context("error reading load average")?;
    let ncpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let cpu = (loadavg.one as f64 / ncpus as f64).clamp(0.0, 1.0);

    let meminfo = procfs::Meminfo::new().context("error reading meminfo")?;
    let available = meminfo.mem_available.unwrap_or(meminfo.mem_free);
    let mem = if meminfo.mem_total > 0 {
        (1.0 - available as f64 / meminfo.mem_total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(SystemLoad { cpu, mem })
}
