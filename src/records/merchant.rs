//! Synthetic Brazilian merchant documents

use super::pick;
use rand::Rng;
use serde_json::{json, Value};

const CHANNELS: &[&str] = &[
    "online",
    "retail",
    "hybrid",
    "food_delivery",
    "b2b",
    "services",
    "luxury",
];

const MCC_CODES: &[&str] = &[
    "5732", "5411", "5734", "5814", "5691", "1520", "5912", "5533", "5942", "5462", "7538", "8021",
    "5995", "7997", "5812", "5094", "8398", "5992",
];

const SURNAMES: &[&str] = &[
    "Silva",
    "Santos",
    "Oliveira",
    "Souza",
    "Rodrigues",
    "Ferreira",
    "Alves",
    "Pereira",
    "Lima",
    "Gomes",
    "Costa",
    "Ribeiro",
    "Martins",
    "Carvalho",
    "Almeida",
    "Lopes",
    "Barbosa",
    "Rocha",
];

const COMPANY_SUFFIXES: &[&str] = &["Ltda.", "S.A.", "S/A", "EIRELI", "ME", "e Filhos"];

const STREET_TYPES: &[&str] = &["Rua", "Avenida", "Travessa", "Alameda", "Praça"];

const NEIGHBORHOODS: &[&str] = &[
    "Centro",
    "Jardim América",
    "Vila Mariana",
    "Boa Vista",
    "Copacabana",
    "Savassi",
    "Batel",
    "Moinhos de Vento",
    "Boa Viagem",
    "Pituba",
    "Aldeota",
    "Asa Sul",
];

const CITIES: &[(&str, &str, &str)] = &[
    ("São Paulo", "SP", "11"),
    ("Rio de Janeiro", "RJ", "21"),
    ("Belo Horizonte", "MG", "31"),
    ("Curitiba", "PR", "41"),
    ("Porto Alegre", "RS", "51"),
    ("Recife", "PE", "81"),
    ("Salvador", "BA", "71"),
    ("Fortaleza", "CE", "85"),
    ("Brasília", "DF", "61"),
    ("Manaus", "AM", "92"),
];

fn company_name<R: Rng>(rng: &mut R) -> String {
    let first = pick(rng, SURNAMES);
    match rng.gen_range(0..3) {
        0 => format!("{} {}", first, pick(rng, COMPANY_SUFFIXES)),
        1 => format!("{} e {} {}", first, pick(rng, SURNAMES), pick(rng, COMPANY_SUFFIXES)),
        _ => format!("{} {}", first, pick(rng, SURNAMES)),
    }
}

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    let weights = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let offset = weights.len() - digits.len();
    let sum: u32 = digits
        .iter()
        .zip(&weights[offset..])
        .map(|(d, w)| d * w)
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

/// Formatted CNPJ (`XX.XXX.XXX/0001-XX`) with valid check digits
pub fn cnpj<R: Rng>(rng: &mut R) -> String {
    let mut digits: Vec<u32> = (0..8).map(|_| rng.gen_range(0..10)).collect();
    digits.extend([0, 0, 0, 1]);
    let first = cnpj_check_digit(&digits);
    digits.push(first);
    let second = cnpj_check_digit(&digits);
    digits.push(second);

    let s: String = digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect();
    format!("{}.{}.{}/{}-{}", &s[0..2], &s[2..5], &s[5..8], &s[8..12], &s[12..14])
}

/// Full merchant document for logical id `id`
pub fn merchant<R: Rng>(id: u64, rng: &mut R) -> Value {
    let company_name = company_name(rng);
    let short: String = company_name
        .split(' ')
        .next()
        .unwrap_or_default()
        .chars()
        .take(10)
        .collect();
    let email_domain: String = company_name
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != ',')
        .collect();
    let (city, state, ddd) = CITIES[rng.gen_range(0..CITIES.len())];

    json!({
        "id": id,
        "cnpj": cnpj(rng),
        "company_name": company_name,
        "company_name_short": short,
        "street": format!("{} {}", pick(rng, STREET_TYPES), pick(rng, SURNAMES)),
        "number": rng.gen_range(1..=9999).to_string(),
        "neighborhood": pick(rng, NEIGHBORHOODS),
        "city": city,
        "state": state,
        "zip_code": format!("{:05}-{:03}", rng.gen_range(1000..100_000), rng.gen_range(0..1000)),
        "channel": pick(rng, CHANNELS),
        "email": format!("contato@{}.com.br", email_domain),
        "phone": format!(
            "+55 {} 9{:04}-{:04}",
            ddd,
            rng.gen_range(0..10_000),
            rng.gen_range(0..10_000)
        ),
        "network_code": rng.gen_range(1..=9999),
        "mcc": pick(rng, MCC_CODES),
    })
}

/// Minimal deterministic document written by the probe
pub fn probe_document(id: u64, issued_at_ms: u64) -> Value {
    let state = if id % 2 == 0 { "SP" } else { "RJ" };
    let channel = if id % 3 == 0 { "online" } else { "retail" };
    let mcc = if id % 5 == 0 { "5411" } else { "5812" };
    json!({
        "id": id,
        "cnpj": format!("{:014}", id),
        "company_name": format!("Empresa {}", id),
        "state": state,
        "channel": channel,
        "network_code": (id % 10_000) + 1,
        "mcc": mcc,
        "t0ms": issued_at_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_merchant_fields() {
        let mut rng = StdRng::seed_from_u64(7);
        let doc = merchant(42, &mut rng);

        assert_eq!(doc["id"], 42);
        let code = doc["network_code"].as_u64().unwrap();
        assert!((1..=9999).contains(&code));
        assert!(MCC_CODES.contains(&doc["mcc"].as_str().unwrap()));
        assert!(CHANNELS.contains(&doc["channel"].as_str().unwrap()));
        assert!(doc["company_name_short"].as_str().unwrap().chars().count() <= 10);
        assert!(doc["email"].as_str().unwrap().ends_with(".com.br"));
    }

    #[test]
    fn test_cnpj_check_digits() {
        // 11.222.333/0001-81 is the canonical valid example
        let base = [1, 1, 2, 2, 2, 3, 3, 3, 0, 0, 0, 1];
        assert_eq!(cnpj_check_digit(&base), 8);
        let mut with_first = base.to_vec();
        with_first.push(8);
        assert_eq!(cnpj_check_digit(&with_first), 1);

        let mut rng = StdRng::seed_from_u64(1);
        let value = cnpj(&mut rng);
        assert_eq!(value.len(), 18);
        assert_eq!(&value[10..15], "/0001");
    }

    #[test]
    fn test_probe_document() {
        let doc = probe_document(10, 1_700_000_000_123);
        assert_eq!(doc["cnpj"], "00000000000010");
        assert_eq!(doc["state"], "SP");
        assert_eq!(doc["mcc"], "5411");
        assert_eq!(doc["network_code"], 11);
        assert_eq!(doc["t0ms"], 1_700_000_000_123u64);
    }
}
