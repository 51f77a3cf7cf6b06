//! Mapping of Keycloak representations onto the normalized resource model.
//!
//! Mapping never fails: absent optional fields become empty strings or are
//! left out of the profile.

use chrono::DateTime;
use serde_json::{Map, Value};
use xavyo_connector::ids::ResourceId;
use xavyo_connector::types::{
    Entitlement, GroupTrait, Resource, ResourceTraits, UserStatus, UserTrait,
};

use crate::config::UserIdentity;
use crate::ids::MembershipEntitlementId;
use crate::models::{KeycloakGroup, KeycloakUser, UserAccess};
use crate::schema::{
    user_resource_type, GROUP_RESOURCE_TYPE, MEMBERSHIP_SLUG, USER_RESOURCE_TYPE,
};

fn insert_str(profile: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        profile.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_bool(profile: &mut Map<String, Value>, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        profile.insert(key.to_string(), Value::Bool(value));
    }
}

fn access_profile(access: &UserAccess) -> Map<String, Value> {
    let mut flags = Map::new();
    insert_bool(&mut flags, "manage", access.manage);
    insert_bool(&mut flags, "view", access.view);
    insert_bool(&mut flags, "impersonate", access.impersonate);
    insert_bool(&mut flags, "mapRoles", access.map_roles);
    insert_bool(
        &mut flags,
        "manageGroupMembership",
        access.manage_group_membership,
    );
    flags
}

/// Id of the user resource under the given identity scheme.
#[must_use]
pub fn user_resource_id(user: &KeycloakUser, identity: UserIdentity) -> ResourceId {
    let id = match identity {
        UserIdentity::ProviderId => user.id.clone(),
        UserIdentity::Username => user.username.clone().unwrap_or_default(),
    };
    ResourceId::new(USER_RESOURCE_TYPE, id)
}

/// Maps a Keycloak user to a user resource.
#[must_use]
pub fn user_resource(
    user: &KeycloakUser,
    identity: UserIdentity,
    parent: Option<&ResourceId>,
) -> Resource {
    let username = user.username.clone().unwrap_or_default();

    let mut profile = Map::new();
    profile.insert("username".to_string(), Value::String(username.clone()));
    profile.insert(
        "email".to_string(),
        Value::String(user.email.clone().unwrap_or_default()),
    );
    profile.insert(
        "firstName".to_string(),
        Value::String(user.first_name.clone().unwrap_or_default()),
    );
    profile.insert(
        "lastName".to_string(),
        Value::String(user.last_name.clone().unwrap_or_default()),
    );
    insert_bool(&mut profile, "emailVerified", user.email_verified);
    if let Some(access) = &user.access {
        profile.insert("access".to_string(), Value::Object(access_profile(access)));
    }

    let created_at = user
        .created_timestamp
        .and_then(DateTime::from_timestamp_millis);

    Resource {
        id: user_resource_id(user, identity),
        display_name: username.clone(),
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::User(UserTrait {
            profile,
            login: username,
            email: user.email.clone().filter(|e| !e.is_empty()),
            status: UserStatus::from_enabled(user.enabled),
            created_at,
        }),
    }
}

/// Maps a Keycloak group to a group resource.
#[must_use]
pub fn group_resource(group: &KeycloakGroup, parent: Option<&ResourceId>) -> Resource {
    let name = group.name.clone().unwrap_or_default();

    let mut profile = Map::new();
    profile.insert("name".to_string(), Value::String(name.clone()));
    profile.insert(
        "path".to_string(),
        Value::String(group.path.clone().unwrap_or_default()),
    );
    insert_str(&mut profile, "description", group.description());
    if let Some(count) = group.sub_group_count {
        profile.insert("subGroupCount".to_string(), Value::from(count));
    }

    Resource {
        id: ResourceId::new(GROUP_RESOURCE_TYPE, group.id.clone()),
        display_name: name,
        parent_resource_id: parent.cloned(),
        traits: ResourceTraits::Group(GroupTrait { profile }),
    }
}

/// The membership entitlement of a group resource.
#[must_use]
pub fn membership_entitlement(group: &Resource) -> Entitlement {
    Entitlement {
        id: MembershipEntitlementId::new(group.id.resource.clone()).to_string(),
        display_name: format!("Membership in {}", group.display_name),
        description: format!("Membership in the {} group", group.display_name),
        resource: group.clone(),
        grantable_to: vec![user_resource_type()],
        slug: MEMBERSHIP_SLUG.to_string(),
    }
}
