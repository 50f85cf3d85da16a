//! Synthetic login sessions stored as flat hashes with a TTL

use super::pick;
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;

const DEVICE_TYPES: &[&str] = &["desktop", "mobile", "tablet"];
const DESKTOP_OS: &[&str] = &["Windows", "macOS", "Linux"];
const MOBILE_OS: &[&str] = &["Android", "iOS"];
const BROWSERS: &[&str] = &["Chrome", "Firefox", "Safari", "Edge", "Opera"];
const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "hotmail.com",
    "yahoo.com.br",
    "outlook.com",
    "uol.com.br",
    "bol.com.br",
];

const CITIES: &[(&str, (f64, f64))] = &[
    ("São Paulo", (-46.6333, -23.5505)),
    ("Rio de Janeiro", (-43.1964, -22.9083)),
    ("Belo Horizonte", (-43.9378, -19.9208)),
    ("Curitiba", (-49.2731, -25.4278)),
    ("Porto Alegre", (-51.2300, -30.0331)),
    ("Recife", (-34.8781, -8.0539)),
    ("Salvador", (-38.5014, -12.9777)),
    ("Fortaleza", (-38.5247, -3.7319)),
    ("Brasília", (-47.8825, -15.7942)),
    ("Manaus", (-60.0250, -3.1190)),
];

const ROLES: &[&str] = &["user", "admin", "support", "auditor", "ops", "partner"];

const SCOPES: &[&str] = &[
    "read:orders",
    "write:orders",
    "read:payments",
    "write:payments",
    "read:users",
    "write:users",
    "read:catalog",
    "write:catalog",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/123.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
    "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 Chrome/123.0 Mobile Safari/537.36",
];

/// One generated session
#[derive(Debug, Clone)]
pub struct Session {
    /// `sess-{seq:08}`, appended to the key prefix
    pub sid: String,
    pub fields: Vec<(String, String)>,
    pub ttl: u64,
}

fn flag<R: Rng>(rng: &mut R, probability: f64) -> &'static str {
    if rng.gen_bool(probability) {
        "1"
    } else {
        "0"
    }
}

fn roles<R: Rng>(rng: &mut R) -> String {
    let mut roles = vec!["user"];
    if rng.gen_bool(0.15) {
        roles.push(pick(rng, &ROLES[1..]));
    }
    roles.sort_unstable();
    roles.join(",")
}

fn scopes<R: Rng>(rng: &mut R) -> String {
    let n = rng.gen_range(1..=4);
    let mut scopes: Vec<&str> = SCOPES.choose_multiple(rng, n).copied().collect();
    scopes.sort_unstable();
    scopes.join(",")
}

/// Session number `seq`, issued at `now` (unix seconds)
pub fn session<R: Rng>(seq: u64, ttl_range: RangeInclusive<u64>, now: i64, rng: &mut R) -> Session {
    let ttl = rng.gen_range(ttl_range);
    let idle = rng.gen_range(0..=ttl.min(3600)) as i64;

    let device = pick(rng, DEVICE_TYPES);
    let (os, is_mobile) = if device == "desktop" {
        (pick(rng, DESKTOP_OS), "0")
    } else {
        (pick(rng, MOBILE_OS), "1")
    };
    let (city, (lon, lat)) = CITIES[rng.gen_range(0..CITIES.len())];

    let ip = format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..=223),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254)
    );
    let email = format!(
        "user{}@{}",
        rng.gen_range(1000..1_000_000),
        pick(rng, EMAIL_DOMAINS)
    );

    let fields = vec![
        ("sid", format!("sess-{:08}", seq)),
        ("uid", rng.gen_range(1..=500_000).to_string()),
        ("email", email),
        ("issued_at", now.to_string()),
        ("last_seen_at", (now - idle).to_string()),
        ("expires_at", (now + ttl as i64).to_string()),
        ("ip", ip),
        ("country", "BR".to_string()),
        ("city", city.to_string()),
        ("geo", format!("{},{}", lon, lat)),
        ("user_agent", pick(rng, USER_AGENTS).to_string()),
        ("device", device.to_string()),
        ("os", os.to_string()),
        ("browser", pick(rng, BROWSERS).to_string()),
        ("is_mobile", is_mobile.to_string()),
        ("roles", roles(rng)),
        ("scopes", scopes(rng)),
        ("is_mfa", flag(rng, 0.35).to_string()),
        ("is_sso", flag(rng, 0.25).to_string()),
        ("revoked", "0".to_string()),
    ];

    Session {
        sid: format!("sess-{:08}", seq),
        fields: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        ttl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_session_consistency() {
        let mut rng = StdRng::seed_from_u64(3);
        let now = 1_700_000_000;
        for seq in 1..=200 {
            let session = session(seq, 1800..=7200, now, &mut rng);
            let fields: HashMap<_, _> = session.fields.iter().cloned().collect();

            assert_eq!(fields["sid"], format!("sess-{:08}", seq));
            assert!((1800..=7200).contains(&session.ttl));
            assert_eq!(fields["expires_at"], (now + session.ttl as i64).to_string());

            let last_seen: i64 = fields["last_seen_at"].parse().unwrap();
            assert!(last_seen <= now && last_seen >= now - 3600);

            let desktop = fields["device"] == "desktop";
            assert_eq!(fields["is_mobile"] == "0", desktop);
            assert_eq!(DESKTOP_OS.contains(&fields["os"].as_str()), desktop);
            assert!(fields["roles"].split(',').any(|r| r == "user"));
            assert!((1..=4).contains(&fields["scopes"].split(',').count()));
            assert_eq!(fields["revoked"], "0");
        }
    }

    #[test]
    fn test_fixed_ttl() {
        let mut rng = StdRng::seed_from_u64(9);
        let session = session(1, 60..=60, 0, &mut rng);
        assert_eq!(session.ttl, 60);
        assert_eq!(session.sid, "sess-00000001");
    }
}
