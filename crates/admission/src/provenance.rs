//! Who made a change, and with what.

use kubetrail_core::{Actor, SourceTool};
use serde_json::{Map, Value};

use crate::envelope::UserInfo;

const SERVICE_ACCOUNT_PREFIX: &str = "system:serviceaccount:";
const SOURCE_IP_EXTRA_KEY: &str = "sourceIP";
const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
const HELM_CHART_LABEL_PREFIX: &str = "helm.sh/chart";

/// Build the actor from request user info.
pub fn actor_from_user_info(user: &UserInfo) -> Actor {
    Actor {
        username: user.username.clone(),
        groups: user.groups.clone(),
        service_account: service_account_of(&user.username),
        source_ip: user
            .extra
            .get(SOURCE_IP_EXTRA_KEY)
            .and_then(|values| values.first())
            .filter(|ip| !ip.is_empty())
            .cloned(),
    }
}

/// `system:serviceaccount:<ns>:<name>` becomes `<ns>/<name>`.
fn service_account_of(username: &str) -> Option<String> {
    let rest = username.strip_prefix(SERVICE_ACCOUNT_PREFIX)?;
    let (namespace, name) = rest.split_once(':')?;
    if namespace.is_empty() || name.is_empty() {
        return None;
    }
    Some(format!("{namespace}/{name}"))
}

/// Guess the issuing tool from the username and the object's labels.
///
/// Helm labels win over everything else, since Helm applies through an
/// ordinary user identity.
pub fn detect_source_tool(username: &str, labels: Option<&Map<String, Value>>) -> SourceTool {
    let managed_by = labels
        .and_then(|l| l.get(MANAGED_BY_LABEL))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty());

    let helm_chart = labels.is_some_and(|l| l.keys().any(|k| k.starts_with(HELM_CHART_LABEL_PREFIX)));
    if helm_chart || managed_by.is_some_and(|v| v.eq_ignore_ascii_case("helm")) {
        return SourceTool::Helm;
    }
    if username.starts_with("system:") || managed_by.is_some() {
        return SourceTool::Controller;
    }
    if !username.is_empty() {
        return SourceTool::Kubectl;
    }
    SourceTool::Unknown
}

/// `metadata.labels` of a resource tree, if it has any.
pub(crate) fn labels_of(object: Option<&Value>) -> Option<&Map<String, Value>> {
    object?.get("metadata")?.get("labels")?.as_object()
}
