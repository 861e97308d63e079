use serde::{Deserialize, Serialize};

/// A doctor directory entry. The directory is static demo data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Doctor {
    pub id: i64,
    pub name: &'static str,
    pub specialty: &'static str,
    pub qualifications: &'static str,
    pub experience_years: u32,
    pub rating: f64,
    pub address: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
    pub availability: &'static str,
    pub accepts_new_patients: bool,
    pub languages: &'static [&'static str],
    pub distance_km: f64,
}

pub static DIRECTORY: [Doctor; 5] = [
    Doctor {
        id: 1,
        name: "Dr. Sarah Johnson",
        specialty: "Dermatology",
        qualifications: "MD, FAAD",
        experience_years: 15,
        rating: 4.8,
        address: "123 Medical Plaza, New York, NY 10001",
        phone: "+1 (555) 123-4567",
        email: "dr.johnson@dermatology.com",
        availability: "Mon-Fri: 9AM-5PM",
        accepts_new_patients: true,
        languages: &["English", "Spanish"],
        distance_km: 2.5,
    },
    Doctor {
        id: 2,
        name: "Dr. Michael Chen",
        specialty: "Dermatology & Oncology",
        qualifications: "MD, PhD",
        experience_years: 20,
        rating: 4.9,
        address: "456 Health Center, New York, NY 10002",
        phone: "+1 (555) 234-5678",
        email: "dr.chen@skincare.com",
        availability: "Mon-Thu: 8AM-6PM",
        accepts_new_patients: true,
        languages: &["English", "Mandarin"],
        distance_km: 3.2,
    },
    Doctor {
        id: 3,
        name: "Dr. Emily Rodriguez",
        specialty: "Pediatric Dermatology",
        qualifications: "MD, FAAP, FAAD",
        experience_years: 12,
        rating: 4.7,
        address: "789 Children's Hospital, New York, NY 10003",
        phone: "+1 (555) 345-6789",
        email: "dr.rodriguez@pediatricderm.com",
        availability: "Tue-Sat: 10AM-4PM",
        accepts_new_patients: false,
        languages: &["English", "Spanish", "French"],
        distance_km: 4.1,
    },
    Doctor {
        id: 4,
        name: "Dr. James Williams",
        specialty: "Dermatology & Cosmetic Surgery",
        qualifications: "MD, FAAD, ASDS",
        experience_years: 18,
        rating: 4.6,
        address: "321 Wellness Avenue, New York, NY 10004",
        phone: "+1 (555) 456-7890",
        email: "dr.williams@dermclinic.com",
        availability: "Mon-Wed-Fri: 9AM-6PM",
        accepts_new_patients: true,
        languages: &["English"],
        distance_km: 5.8,
    },
    Doctor {
        id: 5,
        name: "Dr. Priya Patel",
        specialty: "Dermatology",
        qualifications: "MD, FAAD",
        experience_years: 10,
        rating: 4.9,
        address: "567 Medical Tower, New York, NY 10005",
        phone: "+1 (555) 567-8901",
        email: "dr.patel@skinspecialist.com",
        availability: "Mon-Fri: 8AM-5PM, Sat: 9AM-1PM",
        accepts_new_patients: true,
        languages: &["English", "Hindi", "Gujarati"],
        distance_km: 1.9,
    },
];

/// Raw query-string filters. Values stay strings so lenient parsing
/// never turns into a rejected request.
#[derive(Debug, Default, Deserialize)]
pub struct DoctorQuery {
    pub specialty: Option<String>,
    pub accepts_new_patients: Option<String>,
    pub min_rating: Option<String>,
    pub sort_by: Option<String>,
}

pub fn search(directory: &[Doctor], query: &DoctorQuery) -> Vec<Doctor> {
    let mut doctors: Vec<Doctor> = directory.to_vec();

    if let Some(specialty) = &query.specialty {
        let needle = specialty.to_lowercase();
        doctors.retain(|d| d.specialty.to_lowercase().contains(&needle));
    }

    if let Some(raw) = &query.accepts_new_patients {
        let accepts_new = parse_bool(raw);
        doctors.retain(|d| d.accepts_new_patients == accepts_new);
    }

    if let Some(raw) = &query.min_rating {
        let min_rating = parse_number(raw);
        doctors.retain(|d| d.rating >= min_rating);
    }

    match query.sort_by.as_deref() {
        Some("distance") => doctors.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km)),
        Some("rating") => doctors.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        _ => {}
    }

    doctors
}

pub fn find(directory: &[Doctor], id: i64) -> Option<&Doctor> {
    directory.iter().find(|d| d.id == id)
}

/// Query-string boolean: "1", "true", "on" and "yes" are true, anything else false.
pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

// Leading-number parse: "4.5", " 4 ", "4.5stars" -> value, garbage -> 0.
fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    let mut candidate = &trimmed[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return value;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(doctors: &[Doctor]) -> Vec<i64> {
        doctors.iter().map(|d| d.id).collect()
    }

    #[test]
    fn no_filters_returns_whole_directory_in_order() {
        let result = search(&DIRECTORY, &DoctorQuery::default());
        assert_eq!(ids(&result), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn specialty_matches_case_insensitive_substring() {
        let query = DoctorQuery { specialty: Some("ONCO".into()), ..Default::default() };
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![2]);

        let query = DoctorQuery { specialty: Some("dermatology".into()), ..Default::default() };
        assert_eq!(search(&DIRECTORY, &query).len(), 5);
    }

    #[test]
    fn accepts_new_patients_filter() {
        let query = DoctorQuery { accepts_new_patients: Some("false".into()), ..Default::default() };
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![3]);

        let query = DoctorQuery { accepts_new_patients: Some("yes".into()), ..Default::default() };
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![1, 2, 4, 5]);
    }

    #[test]
    fn min_rating_filter_and_rating_sort() {
        let query = DoctorQuery {
            min_rating: Some("4.8".into()),
            sort_by: Some("rating".into()),
            ..Default::default()
        };
        // Stable sort keeps 2 before 5 at equal rating.
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![2, 5, 1]);
    }

    #[test]
    fn distance_sort_is_ascending() {
        let query = DoctorQuery { sort_by: Some("distance".into()), ..Default::default() };
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![5, 1, 2, 3, 4]);
    }

    #[test]
    fn unknown_sort_keeps_directory_order() {
        let query = DoctorQuery { sort_by: Some("name".into()), ..Default::default() };
        assert_eq!(ids(&search(&DIRECTORY, &query)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn lenient_number_and_bool_parsing() {
        assert_eq!(parse_number("4.5stars"), 4.5);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number(" 3 "), 3.0);
        assert_eq!(parse_number("4."), 4.0);
        assert!(parse_bool("ON"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("nope"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn find_by_id() {
        assert_eq!(find(&DIRECTORY, 5).map(|d| d.name), Some("Dr. Priya Patel"));
        assert!(find(&DIRECTORY, 42).is_none());
    }
}
