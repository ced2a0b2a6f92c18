use crate::streaming::StreamingOffer;

/// Collapses a provider display name into a stable lookup key: lowercase,
/// alphanumerics plus `+`, with the common Prime/Disney/Apple aliases merged.
pub fn normalize_provider_key(name: Option<&str>) -> String {
    let n: String = name
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
        .collect();
    match n.as_str() {
        "amazonprimevideo" | "primevideo" | "prime" => "prime".to_string(),
        "disney+" | "disneyplus" | "disney" => "disney".to_string(),
        "appletv+" | "appletvplus" | "appletv" => "appletv".to_string(),
        "netflix" => "netflix".to_string(),
        _ => n,
    }
}

/// Ordered fallback: preferred provider (subscription first), then any
/// subscription with a link, then any offer with a link, then the first.
pub fn select_best_offer<'a>(
    offers: &'a [StreamingOffer],
    preferred: Option<&str>,
) -> Option<&'a StreamingOffer> {
    if offers.is_empty() {
        return None;
    }

    if let Some(preferred) = preferred {
        let matching: Vec<&StreamingOffer> = offers
            .iter()
            .filter(|o| normalize_provider_key(o.service.as_deref()) == preferred)
            .collect();
        let pick = matching
            .iter()
            .find(|o| o.streaming_type.as_deref() == Some("subscription"))
            .copied()
            .or_else(|| matching.first().copied());
        if let Some(offer) = pick {
            if offer.link.is_some() {
                return Some(offer);
            }
        }
    }

    if let Some(sub) = offers
        .iter()
        .find(|o| o.streaming_type.as_deref() == Some("subscription") && o.link.is_some())
    {
        return Some(sub);
    }

    offers
        .iter()
        .find(|o| o.link.is_some())
        .or_else(|| offers.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(service: &str, streaming_type: &str, link: Option<&str>) -> StreamingOffer {
        StreamingOffer {
            service: Some(service.to_string()),
            streaming_type: Some(streaming_type.to_string()),
            link: link.map(|l| l.to_string()),
            video_link: None,
            quality: None,
        }
    }

    #[test]
    fn normalizes_common_aliases() {
        assert_eq!(normalize_provider_key(Some("Amazon Prime Video")), "prime");
        assert_eq!(normalize_provider_key(Some("Disney+")), "disney");
        assert_eq!(normalize_provider_key(Some("Apple TV+")), "appletv");
        assert_eq!(normalize_provider_key(Some("Netflix")), "netflix");
        assert_eq!(normalize_provider_key(Some("NOW TV")), "nowtv");
        assert_eq!(normalize_provider_key(None), "");
    }

    #[test]
    fn prefers_the_preferred_provider_subscription() {
        let offers = vec![
            offer("netflix", "subscription", Some("https://netflix/1")),
            offer("Amazon Prime Video", "rent", Some("https://prime/rent")),
            offer("Amazon Prime Video", "subscription", Some("https://prime/sub")),
        ];
        let best = select_best_offer(&offers, Some("prime")).unwrap();
        assert_eq!(best.link.as_deref(), Some("https://prime/sub"));
    }

    #[test]
    fn falls_back_to_any_subscription_then_any_link() {
        let offers = vec![
            offer("itunes", "buy", Some("https://itunes/buy")),
            offer("netflix", "subscription", Some("https://netflix/1")),
        ];
        let best = select_best_offer(&offers, Some("disney")).unwrap();
        assert_eq!(best.link.as_deref(), Some("https://netflix/1"));

        let no_subs = vec![
            offer("itunes", "buy", None),
            offer("google", "rent", Some("https://google/rent")),
        ];
        let best = select_best_offer(&no_subs, None).unwrap();
        assert_eq!(best.link.as_deref(), Some("https://google/rent"));
    }

    #[test]
    fn empty_offers_select_nothing() {
        assert!(select_best_offer(&[], None).is_none());
        assert!(select_best_offer(&[], Some("prime")).is_none());
    }

    #[test]
    fn linkless_list_still_returns_first() {
        let offers = vec![offer("netflix", "subscription", None)];
        let best = select_best_offer(&offers, None).unwrap();
        assert_eq!(best.service.as_deref(), Some("netflix"));
    }
}
