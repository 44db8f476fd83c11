//! Human-friendly output.

use weatherlook_core::{CitySuggestion, SessionState, Units, WeatherReading, profile::Profile};

/// Prints the reading. A session that ended in failure becomes an error so the
/// process exits non-zero.
pub fn print_state(state: &SessionState, units: Units) -> anyhow::Result<()> {
    if let Some(err) = &state.error {
        anyhow::bail!("{}", err.message);
    }
    match &state.reading {
        Some(reading) => print!("{}", format_reading(reading, units)),
        None => println!("No weather data available."),
    }
    Ok(())
}

pub fn format_reading(r: &WeatherReading, units: Units) -> String {
    let t = units.temperature_suffix();
    let mut out = String::new();

    let place = if r.country.is_empty() { r.name.clone() } else { format!("{}, {}", r.name, r.country) };
    out.push_str(&format!("{place}\n"));
    out.push_str(&format!("  {} ({})\n", r.condition, r.description));
    out.push_str(&format!(
        "  Temperature: {:.1}{t} (feels like {:.1}{t}), min {:.1}{t} / max {:.1}{t}\n",
        r.temperature, r.feels_like, r.temp_min, r.temp_max
    ));
    out.push_str(&format!("  Humidity:    {}%\n", r.humidity));
    out.push_str(&format!("  Pressure:    {} hPa\n", r.pressure));

    let direction = r.wind_deg.map(|d| format!(" from {d}°")).unwrap_or_default();
    out.push_str(&format!("  Wind:        {:.1} {}{direction}\n", r.wind_speed, units.speed_suffix()));

    if let (Some(rise), Some(set)) = (r.sunrise_local(), r.sunset_local()) {
        out.push_str(&format!(
            "  Sunrise:     {}  Sunset: {}\n",
            rise.format("%H:%M"),
            set.format("%H:%M")
        ));
    }
    out
}

pub fn print_suggestions(suggestions: &[CitySuggestion]) {
    if suggestions.is_empty() {
        println!("No matching cities.");
        return;
    }
    for s in suggestions {
        println!("{s}");
    }
}

pub fn print_profile(profile: &Profile) {
    println!("Name:  {}", profile.name);
    println!("Email: {}", profile.email);
    println!("Phone: {}", profile.phone);
}
