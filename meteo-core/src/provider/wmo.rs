//! WMO weather interpretation codes as reported by Open-Meteo.

/// Broad category, e.g. `"Rain"`.
pub fn category(code: i32) -> &'static str {
    match code {
        0 => "Clear",
        1..=3 => "Clouds",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing Drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing Rain",
        71 | 73 | 75 => "Snow",
        77 => "Snow Grains",
        80..=82 => "Rain Showers",
        85 | 86 => "Snow Showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with Hail",
        _ => "Unknown",
    }
}

/// Human-readable description (French).
pub fn description(code: i32) -> &'static str {
    match code {
        0 => "Ciel dégagé",
        1 => "Principalement dégagé",
        2 => "Partiellement nuageux",
        3 => "Nuageux",
        45 => "Brouillard",
        48 => "Brouillard givrant",
        51 => "Bruine légère",
        53 => "Bruine modérée",
        55 => "Bruine dense",
        56 => "Bruine verglaçante légère",
        57 => "Bruine verglaçante dense",
        61 => "Pluie légère",
        63 => "Pluie modérée",
        65 => "Pluie forte",
        66 => "Pluie verglaçante légère",
        67 => "Pluie verglaçante forte",
        71 => "Neige légère",
        73 => "Neige modérée",
        75 => "Neige forte",
        77 => "Grains de neige",
        80 => "Averses de pluie légères",
        81 => "Averses de pluie modérées",
        82 => "Averses de pluie violentes",
        85 => "Averses de neige légères",
        86 => "Averses de neige fortes",
        95 => "Orage",
        96 => "Orage avec grêle légère",
        99 => "Orage avec grêle forte",
        _ => "Conditions météo inconnues",
    }
}

/// OpenWeatherMap-style icon id.
pub fn icon(code: i32) -> &'static str {
    match code {
        0 => "01d",
        1 => "02d",
        2 => "03d",
        3 => "04d",
        45 | 48 => "50d",
        51 | 53 | 55 | 56 | 57 => "09d",
        61 | 63 | 65 | 66 | 67 => "10d",
        71 | 73 | 75 | 77 => "13d",
        80..=82 => "09d",
        85 | 86 => "13d",
        95 | 96 | 99 => "11d",
        _ => "50d",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(category(61), "Rain");
        assert_eq!(description(61), "Pluie légère");
        assert_eq!(icon(61), "10d");

        assert_eq!(category(2), "Clouds");
        assert_eq!(description(96), "Orage avec grêle légère");
        assert_eq!(icon(77), "13d");
    }

    #[test]
    fn unknown_code_falls_back() {
        assert_eq!(category(42), "Unknown");
        assert_eq!(description(42), "Conditions météo inconnues");
        assert_eq!(icon(42), "50d");
    }
}
