//! Per-IP rate limiting (§4.1), keyed by endpoint category with its own
//! quota per the original service's `@limiter.limit(...)` decorators —
//! 5/minute for login, 3/hour for registration, 5/hour for password
//! change/reset, 3/hour for forgot-password, 10/minute for profile
//! updates. `governor` replaces the original's `slowapi`, keyed the same
//! way: one bucket per (category, client IP).

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter, state::keyed::DefaultKeyedStateStore};

type Limiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, governor::clock::DefaultClock>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitCategory {
    Login,
    Registration,
    ProfileUpdate,
    ForgotPassword,
    ResetPassword,
    ChangePassword,
}

impl RateLimitCategory {
    fn quota(self) -> Quota {
        match self {
            RateLimitCategory::Login => Quota::per_minute(nz(5)),
            RateLimitCategory::Registration => Quota::per_hour(nz(3)),
            RateLimitCategory::ProfileUpdate => Quota::per_minute(nz(10)),
            RateLimitCategory::ForgotPassword => Quota::per_hour(nz(3)),
            RateLimitCategory::ResetPassword => Quota::per_hour(nz(5)),
            RateLimitCategory::ChangePassword => Quota::per_hour(nz(5)),
        }
    }
}

fn nz(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero rate limit")
}

pub struct RateLimiters {
    login: Limiter,
    registration: Limiter,
    profile_update: Limiter,
    forgot_password: Limiter,
    reset_password: Limiter,
    change_password: Limiter,
    bypass: bool,
}

impl RateLimiters {
    pub fn new(bypass: bool) -> Arc<Self> {
        Arc::new(Self {
            login: RateLimiter::keyed(RateLimitCategory::Login.quota()),
            registration: RateLimiter::keyed(RateLimitCategory::Registration.quota()),
            profile_update: RateLimiter::keyed(RateLimitCategory::ProfileUpdate.quota()),
            forgot_password: RateLimiter::keyed(RateLimitCategory::ForgotPassword.quota()),
            reset_password: RateLimiter::keyed(RateLimitCategory::ResetPassword.quota()),
            change_password: RateLimiter::keyed(RateLimitCategory::ChangePassword.quota()),
            bypass,
        })
    }

    /// Returns `true` if the request is allowed. Under the debug-bypass
    /// flag every category is unlimited, matching the original's
    /// `"100/minute" if DEBUG else ...` relaxation.
    pub fn check(&self, category: RateLimitCategory, ip: IpAddr) -> bool {
        if self.bypass {
            return true;
        }
        let limiter = match category {
            RateLimitCategory::Login => &self.login,
            RateLimitCategory::Registration => &self.registration,
            RateLimitCategory::ProfileUpdate => &self.profile_update,
            RateLimitCategory::ForgotPassword => &self.forgot_password,
            RateLimitCategory::ResetPassword => &self.reset_password,
            RateLimitCategory::ChangePassword => &self.change_password,
        };
        limiter.check_key(&ip).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_flag_always_allows() {
        let limiters = RateLimiters::new(true);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        for _ in 0..1000 {
            assert!(limiters.check(RateLimitCategory::Login, ip));
        }
    }

    #[test]
    fn login_quota_eventually_rejects() {
        let limiters = RateLimiters::new(false);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let mut rejected = false;
        for _ in 0..20 {
            if !limiters.check(RateLimitCategory::Login, ip) {
                rejected = true;
                break;
            }
        }
        assert!(rejected, "expected the 5/minute login quota to reject eventually");
    }

    #[test]
    fn distinct_ips_have_independent_buckets() {
        let limiters = RateLimiters::new(false);
        let a: IpAddr = "10.0.0.2".parse().unwrap();
        let b: IpAddr = "10.0.0.3".parse().unwrap();
        for _ in 0..5 {
            assert!(limiters.check(RateLimitCategory::Login, a));
        }
        assert!(limiters.check(RateLimitCategory::Login, b));
    }
}
