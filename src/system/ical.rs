/*!
 * Minimal iCalendar property extraction
 *
 * The local engine only needs a handful of top-level facts about a component
 * (its UID, its dropbox and which component kind it carries), so this does
 * line scanning rather than full parsing.
 */

use podstore_interface::ComponentType;

fn lines(component: &str) -> impl Iterator<Item = &str> {
    component.split('\n').map(|line| line.trim_end_matches('\r'))
}

/// Value of the first property called `name`, ignoring parameters
pub fn property<'a>(component: &'a str, name: &str) -> Option<&'a str> {
    lines(component).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.split(';').next()?;
        key.eq_ignore_ascii_case(name).then_some(value.trim())
    })
}

pub fn uid_of(component: &str) -> Option<&str> {
    property(component, "UID").filter(|uid| !uid.is_empty())
}

/// Last path segment of the X-APPLE-DROPBOX property
pub fn dropbox_id_of(component: &str) -> Option<String> {
    let path = property(component, "X-APPLE-DROPBOX")?;
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// The component kind carried by an iCalendar object, if it is one we track
pub fn component_type_of(component: &str) -> Option<ComponentType> {
    lines(component).find_map(|line| match line.trim().to_ascii_uppercase().as_str() {
        "BEGIN:VEVENT" => Some(ComponentType::Vevent),
        "BEGIN:VTODO" => Some(ComponentType::Vtodo),
        _ => None,
    })
}
