use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Fonte de tempo do store, usada para resolver expiração.
///
/// É wall-clock (epoch Unix) e não monotônica porque EXAT/PXAT carregam
/// timestamps absolutos. Abstraída em trait para que testes dirijam o
/// relógio manualmente em vez de dormir de verdade.
pub trait Clock: Send + Sync {
    /// Milissegundos desde o epoch Unix.
    fn now_ms(&self) -> u64;
}

/// Relógio de produção, baseado em SystemTime.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Relógio avançado manualmente, para testes determinísticos de expiração.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock(AtomicU64::new(start_ms))
    }

    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        clock.advance(50);
        assert_eq!(clock.now_ms(), 150);
    }

    #[test]
    fn system_clock_is_past_2020() {
        // 2020-01-01 em epoch ms
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
