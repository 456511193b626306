use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    env::{Environment, StorageScope},
    error::ConditionError,
};

use super::evaluator::ConditionEvaluator;

type Builtin = fn(&Value, &dyn Environment) -> Result<bool, ConditionError>;

const BUILTINS: &[(&str, Builtin)] = &[
    ("page.url.contains", url_contains),
    ("page.url.equals", url_equals),
    ("page.pathname.contains", pathname_contains),
    ("page.pathname.equals", pathname_equals),
    ("page.search.contains", search_contains),
    ("page.search.equals", search_equals),
    ("page.hash.contains", hash_contains),
    ("page.hash.equals", hash_equals),
    ("dom.element.exists", element_exists),
    ("dom.element.count.greater", element_count_greater),
    ("dom.element.count.equals", element_count_equals),
    ("dom.element.has.class", element_has_class),
    ("dom.element.has.text", element_has_text),
    ("time.after", time_after),
    ("time.before", time_before),
    ("time.between", time_between),
    ("time.hour.between", hour_between),
    ("time.day.of.week", day_of_week),
    ("device.mobile", device_mobile),
    ("device.desktop", device_desktop),
    ("device.screen.width.greater", screen_width_greater),
    ("device.screen.width.less", screen_width_less),
    ("device.viewport.width.greater", viewport_width_greater),
    ("device.viewport.width.less", viewport_width_less),
    ("storage.local.exists", local_exists),
    ("storage.local.equals", local_equals),
    ("storage.session.exists", session_exists),
    ("storage.session.equals", session_equals),
    ("cookie.exists", cookie_exists),
    ("cookie.equals", cookie_equals),
    ("always", always),
    ("never", never),
];

const MOBILE_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

pub(crate) fn install(evaluator: &mut ConditionEvaluator) {
    for (kind, predicate) in BUILTINS {
        evaluator.register(*kind, *predicate);
    }
}

#[derive(Deserialize)]
struct SelectorCount {
    selector: String,
    count: f64,
}

#[derive(Deserialize)]
struct SelectorClass {
    selector: String,
    #[serde(rename = "className", alias = "class_name", alias = "class")]
    class_name: String,
}

#[derive(Deserialize)]
struct SelectorText {
    selector: String,
    text: String,
}

#[derive(Deserialize)]
struct Range<T> {
    start: T,
    end: T,
}

#[derive(Deserialize)]
struct KeyValue {
    #[serde(alias = "name")]
    key: String,
    value: String,
}

fn arg<'a, T: Deserialize<'a>>(value: &'a Value) -> Result<T, ConditionError> {
    Ok(T::deserialize(value)?)
}

fn url_contains(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let needle: String = arg(value)?;
    Ok(env.location()?.href.contains(&needle))
}

fn url_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let expected: String = arg(value)?;
    Ok(env.location()?.href == expected)
}

fn pathname_contains(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let needle: String = arg(value)?;
    Ok(env.location()?.pathname.contains(&needle))
}

fn pathname_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let expected: String = arg(value)?;
    Ok(env.location()?.pathname == expected)
}

fn search_contains(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let needle: String = arg(value)?;
    Ok(env.location()?.search.contains(&needle))
}

fn search_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let expected: String = arg(value)?;
    Ok(env.location()?.search == expected)
}

fn hash_contains(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let needle: String = arg(value)?;
    Ok(env.location()?.hash.contains(&needle))
}

fn hash_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let expected: String = arg(value)?;
    Ok(env.location()?.hash == expected)
}

fn element_exists(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let selector: String = arg(value)?;
    Ok(env.query_first(&selector)?.is_some())
}

fn element_count_greater(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let SelectorCount { selector, count } = arg(value)?;
    Ok(env.query_count(&selector)? as f64 > count)
}

fn element_count_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let SelectorCount { selector, count } = arg(value)?;
    Ok(env.query_count(&selector)? as f64 == count)
}

fn element_has_class(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let SelectorClass {
        selector,
        class_name,
    } = arg(value)?;
    Ok(env
        .query_first(&selector)?
        .is_some_and(|element| element.classes.iter().any(|c| *c == class_name)))
}

fn element_has_text(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let SelectorText { selector, text } = arg(value)?;
    Ok(env
        .query_first(&selector)?
        .is_some_and(|element| element.text.contains(&text)))
}

fn time_after(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let now = env.now();
    Ok(now > instant(value, now.offset())?)
}

fn time_before(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let now = env.now();
    Ok(now < instant(value, now.offset())?)
}

fn time_between(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let Range { start, end }: Range<Value> = arg(value)?;
    let now = env.now();
    Ok(now >= instant(&start, now.offset())? && now <= instant(&end, now.offset())?)
}

fn hour_between(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let Range { start, end }: Range<u32> = arg(value)?;
    let hour = env.now().hour();
    Ok(hour >= start && hour <= end)
}

fn day_of_week(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let day: u32 = arg(value)?;
    Ok(env.now().weekday().num_days_from_sunday() == day)
}

fn always(_: &Value, _: &dyn Environment) -> Result<bool, ConditionError> {
    Ok(true)
}

fn never(_: &Value, _: &dyn Environment) -> Result<bool, ConditionError> {
    Ok(false)
}

fn is_mobile(env: &dyn Environment) -> Result<bool, ConditionError> {
    let user_agent = env.user_agent()?.to_lowercase();
    Ok(MOBILE_TOKENS.iter().any(|token| user_agent.contains(token)))
}

fn device_mobile(_: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    is_mobile(env)
}

fn device_desktop(_: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    Ok(!is_mobile(env)?)
}

fn screen_width_greater(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let threshold: f64 = arg(value)?;
    Ok(f64::from(env.screen_width()?) > threshold)
}

fn screen_width_less(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let threshold: f64 = arg(value)?;
    Ok(f64::from(env.screen_width()?) < threshold)
}

fn viewport_width_greater(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let threshold: f64 = arg(value)?;
    Ok(f64::from(env.viewport_width()?) > threshold)
}

fn viewport_width_less(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let threshold: f64 = arg(value)?;
    Ok(f64::from(env.viewport_width()?) < threshold)
}

fn storage_exists(
    scope: StorageScope,
    value: &Value,
    env: &dyn Environment,
) -> Result<bool, ConditionError> {
    let key: String = arg(value)?;
    Ok(env.storage(scope, &key)?.is_some())
}

fn storage_equals(
    scope: StorageScope,
    value: &Value,
    env: &dyn Environment,
) -> Result<bool, ConditionError> {
    let KeyValue { key, value } = arg(value)?;
    Ok(env.storage(scope, &key)?.as_deref() == Some(value.as_str()))
}

fn local_exists(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    storage_exists(StorageScope::Local, value, env)
}

fn local_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    storage_equals(StorageScope::Local, value, env)
}

fn session_exists(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    storage_exists(StorageScope::Session, value, env)
}

fn session_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    storage_equals(StorageScope::Session, value, env)
}

/// Finds the `name=...` entry of a raw cookie header.
fn find_cookie<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split(';').map(str::trim).find(|cookie| {
        cookie
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('='))
    })
}

fn cookie_exists(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let name: String = arg(value)?;
    Ok(find_cookie(&env.cookies()?, &name).is_some())
}

fn cookie_equals(value: &Value, env: &dyn Environment) -> Result<bool, ConditionError> {
    let KeyValue { key, value } = arg(value)?;
    let cookies = env.cookies()?;
    // Value runs up to the next `=`, if any.
    let actual = find_cookie(&cookies, &key).and_then(|cookie| cookie.split('=').nth(1));
    Ok(actual == Some(value.as_str()))
}

/// Reads a timestamp argument: epoch milliseconds, RFC 3339, a local
/// date-time in the page's offset, or a bare date at UTC midnight.
fn instant(value: &Value, offset: &FixedOffset) -> Result<DateTime<FixedOffset>, ConditionError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|utc| utc.fixed_offset())
            .ok_or_else(|| ConditionError::InvalidTimestamp(n.to_string())),
        Value::String(s) => parse_timestamp(s, offset),
        other => Err(ConditionError::InvalidTimestamp(other.to_string())),
    }
}

fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Result<DateTime<FixedOffset>, ConditionError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed);
    }

    const LOCAL_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| ConditionError::InvalidTimestamp(raw.to_string()));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().fixed_offset())
        .ok_or_else(|| ConditionError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvironmentSnapshot;
    use serde_json::json;

    fn at(rfc3339: &str) -> EnvironmentSnapshot {
        let now = DateTime::parse_from_rfc3339(rfc3339).expect("valid test instant");
        EnvironmentSnapshot::new().at(now)
    }

    #[test]
    fn location_predicates() {
        let env = EnvironmentSnapshot::new()
            .with_url("https://shop.example.com/collections/sale?page=2#top");

        assert!(url_contains(&json!("example.com"), &env).unwrap());
        assert!(url_equals(&json!("https://shop.example.com/collections/sale?page=2#top"), &env).unwrap());
        assert!(pathname_contains(&json!("/collections"), &env).unwrap());
        assert!(!pathname_equals(&json!("/collections"), &env).unwrap());
        assert!(search_contains(&json!("page=2"), &env).unwrap());
        assert!(search_equals(&json!("?page=2"), &env).unwrap());
        assert!(hash_contains(&json!("top"), &env).unwrap());
        assert!(hash_equals(&json!("#top"), &env).unwrap());
    }

    #[test]
    fn structural_predicates() {
        let env = EnvironmentSnapshot::new()
            .with_element(".product", &["product", "on-sale"], "Classic Tee")
            .with_element(".product", &["product"], "Hoodie");

        assert!(element_exists(&json!(".product"), &env).unwrap());
        assert!(!element_exists(&json!(".cart"), &env).unwrap());
        assert!(element_count_greater(&json!({ "selector": ".product", "count": 1 }), &env).unwrap());
        assert!(element_count_equals(&json!({ "selector": ".product", "count": 2 }), &env).unwrap());
        assert!(
            element_has_class(&json!({ "selector": ".product", "className": "on-sale" }), &env)
                .unwrap()
        );
        assert!(
            !element_has_class(&json!({ "selector": ".missing", "className": "x" }), &env).unwrap()
        );
        assert!(element_has_text(&json!({ "selector": ".product", "text": "Tee" }), &env).unwrap());
    }

    #[test]
    fn count_thresholds_compare_numerically() {
        let env = EnvironmentSnapshot::new().with_element(".a", &[], "");
        let empty = EnvironmentSnapshot::new();

        assert!(element_count_greater(&json!({ "selector": ".a", "count": -1 }), &empty).unwrap());
        assert!(element_count_greater(&json!({ "selector": ".a", "count": 0.5 }), &env).unwrap());
        assert!(!element_count_greater(&json!({ "selector": ".a", "count": 1.5 }), &env).unwrap());
        assert!(!element_count_equals(&json!({ "selector": ".a", "count": 0.5 }), &env).unwrap());
        assert!(element_count_equals(&json!({ "selector": ".a", "count": 1.0 }), &env).unwrap());
    }

    #[test]
    fn malformed_arguments_are_errors() {
        let env = EnvironmentSnapshot::new().with_element(".a", &[], "");
        assert!(matches!(
            element_count_greater(&json!(".a"), &env),
            Err(ConditionError::InvalidArgument(_))
        ));
        assert!(matches!(
            url_contains(&json!(42), &env),
            Err(ConditionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn absolute_time_predicates() {
        let env = at("2026-10-19T12:00:00-03:00");

        assert!(time_after(&json!("2026-01-01"), &env).unwrap());
        assert!(!time_after(&json!("2999-01-01"), &env).unwrap());
        assert!(time_before(&json!("2026-10-19T12:30:00-03:00"), &env).unwrap());
        assert!(
            time_between(&json!({ "start": "2026-10-19T00:00", "end": "2026-10-19T23:59" }), &env)
                .unwrap()
        );
        // Epoch milliseconds for 2000-01-01T00:00:00Z.
        assert!(time_after(&json!(946_684_800_000_i64), &env).unwrap());
        assert!(matches!(
            time_after(&json!("next tuesday"), &env),
            Err(ConditionError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn local_date_times_use_the_page_offset() {
        let env = at("2026-10-19T12:00:00-03:00");
        // Naive date-times are read at -03:00, not UTC.
        assert!(time_after(&json!("2026-10-19T11:59:00"), &env).unwrap());
        assert!(!time_after(&json!("2026-10-19 12:01"), &env).unwrap());
    }

    #[test]
    fn hour_and_weekday_predicates() {
        // 2026-10-19 is a Monday.
        let env = at("2026-10-19T21:15:00+02:00");

        assert!(hour_between(&json!({ "start": 18, "end": 21 }), &env).unwrap());
        assert!(!hour_between(&json!({ "start": 8, "end": 20 }), &env).unwrap());
        assert!(day_of_week(&json!(1), &env).unwrap());
        assert!(!day_of_week(&json!(0), &env).unwrap());
    }

    #[test]
    fn device_predicates() {
        let phone = EnvironmentSnapshot::new()
            .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)")
            .with_widths(390, 390);
        let desktop = EnvironmentSnapshot::new()
            .with_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/131.0")
            .with_widths(1920, 1280);

        assert!(device_mobile(&Value::Null, &phone).unwrap());
        assert!(device_desktop(&Value::Null, &desktop).unwrap());
        assert!(screen_width_less(&json!(768), &phone).unwrap());
        assert!(screen_width_greater(&json!(1024), &desktop).unwrap());
        assert!(viewport_width_greater(&json!(1279.5), &desktop).unwrap());
        assert!(!viewport_width_less(&json!(390), &phone).unwrap());
    }

    #[test]
    fn missing_user_agent_is_an_error() {
        let env = EnvironmentSnapshot::new();
        assert!(matches!(
            device_desktop(&Value::Null, &env),
            Err(ConditionError::Environment(_))
        ));
    }

    #[test]
    fn storage_predicates() {
        let env = EnvironmentSnapshot::new()
            .with_storage(StorageScope::Local, "coupon_seen", "1")
            .with_storage(StorageScope::Session, "popup", "closed");

        assert!(local_exists(&json!("coupon_seen"), &env).unwrap());
        assert!(!session_exists(&json!("coupon_seen"), &env).unwrap());
        assert!(local_equals(&json!({ "key": "coupon_seen", "value": "1" }), &env).unwrap());
        assert!(session_equals(&json!({ "key": "popup", "value": "closed" }), &env).unwrap());
        assert!(!session_equals(&json!({ "key": "popup", "value": "open" }), &env).unwrap());
    }

    #[test]
    fn cookie_predicates() {
        let env = EnvironmentSnapshot::new().with_cookie("session=abc; ab_test=B; token=x=y");

        assert!(cookie_exists(&json!("ab_test"), &env).unwrap());
        assert!(!cookie_exists(&json!("ab"), &env).unwrap());
        assert!(cookie_equals(&json!({ "name": "ab_test", "value": "B" }), &env).unwrap());
        assert!(!cookie_equals(&json!({ "name": "session", "value": "xyz" }), &env).unwrap());
        assert!(cookie_equals(&json!({ "name": "token", "value": "x" }), &env).unwrap());
    }
}
