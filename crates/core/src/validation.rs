use crate::{
    error::InvalidDescriptor,
    types::{
        descriptor::{Payload, ResourceDescriptor, ResourceSpec},
        primitives::{DomId, Locator, ResourceKind},
    },
};

pub fn validate_resource(spec: ResourceSpec) -> Result<ResourceDescriptor, InvalidDescriptor> {
    let condition = spec.condition.ok_or(InvalidDescriptor::MissingCondition)?;

    let url = non_blank(spec.url);
    let code = non_blank(spec.code);
    let dom_id = non_blank(spec.id).map(DomId::new);

    let payload = match (spec.kind, url, code) {
        (_, None, None) => return Err(InvalidDescriptor::MissingPayload),
        (_, Some(_), Some(_)) => return Err(InvalidDescriptor::AmbiguousPayload),

        (ResourceKind::Script, Some(url), None) => Payload::Script {
            locator: Locator::new(url),
            dom_id,
        },
        // A script carrying only source text runs as inline code.
        (ResourceKind::Script, None, Some(source)) => Payload::InlineCode { source },

        (ResourceKind::Style, Some(url), None) => Payload::Style {
            locator: Locator::new(url),
            dom_id,
        },
        (ResourceKind::Style, None, Some(_)) => {
            return Err(InvalidDescriptor::StyleRequiresLocator);
        }

        (ResourceKind::Inline, None, Some(source)) => Payload::InlineCode { source },
        (ResourceKind::Inline, Some(_), None) => {
            return Err(InvalidDescriptor::InlineRequiresSource);
        }
    };

    Ok(ResourceDescriptor {
        identity: non_blank(spec.name),
        condition,
        payload,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
