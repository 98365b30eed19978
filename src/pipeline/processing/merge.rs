//! Field-level merge of two records confirmed to be the same lounge.

use crate::domain::LoungeRecord;

fn fill(existing: &mut Option<String>, incoming: &Option<String>) {
    if existing.as_deref().map_or(true, |v| v.trim().is_empty()) {
        if let Some(value) = incoming.as_deref().filter(|v| !v.trim().is_empty()) {
            *existing = Some(value.to_string());
        }
    }
}

/// Combine `incoming` into `existing`. Total: never fails, never drops a
/// non-empty value.
///
/// Scalars are filled only where `existing` is empty, sets are unioned, the
/// longer description wins, and the rating pair is replaced only by a
/// strictly higher rating. Identity (`id`, `name`, `source`) stays with
/// `existing`.
pub fn merge_records(existing: &LoungeRecord, incoming: &LoungeRecord) -> LoungeRecord {
    let mut merged = existing.clone();

    fill(&mut merged.airport_code, &incoming.airport_code);
    fill(&mut merged.airport_name, &incoming.airport_name);
    fill(&mut merged.terminal, &incoming.terminal);
    fill(&mut merged.city, &incoming.city);
    fill(&mut merged.country, &incoming.country);
    fill(&mut merged.continent, &incoming.continent);
    fill(&mut merged.iso_country, &incoming.iso_country);
    fill(&mut merged.location, &incoming.location);
    fill(&mut merged.open_hours, &incoming.open_hours);
    fill(&mut merged.conditions, &incoming.conditions);
    if merged.coordinates.is_none() {
        merged.coordinates = incoming.coordinates;
    }
    if merged.airport_coordinates.is_none() {
        merged.airport_coordinates = incoming.airport_coordinates;
    }
    if merged.lounge_type.is_none() {
        merged.lounge_type = incoming.lounge_type.clone();
    }

    let existing_len = existing.description.as_deref().map_or(0, |d| d.chars().count());
    if let Some(description) = incoming.description.as_deref() {
        if description.chars().count() > existing_len {
            merged.description = Some(description.to_string());
        }
    }

    merged.amenities.extend(incoming.amenities.iter().cloned());
    merged.access_methods.extend(incoming.access_methods.iter().cloned());
    merged.data_sources.extend(incoming.data_sources.iter().cloned());
    merged.data_sources.insert(incoming.source.clone());
    merged.external_ids.union_with(&incoming.external_ids);

    for image in &incoming.images {
        if !merged.images.contains(image) {
            merged.images.push(image.clone());
        }
    }

    if incoming.rating > existing.rating {
        merged.rating = incoming.rating;
        merged.review_count = incoming.review_count;
    }

    if incoming.verified && !existing.verified {
        merged.verified = true;
        merged.verification_source = incoming
            .verification_source
            .clone()
            .or_else(|| Some(incoming.source.clone()));
    }

    merged.merge_count = existing.merge_count.saturating_add(1);
    merged
}
