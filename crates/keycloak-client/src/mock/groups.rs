//! Group operations for MockKeycloakClient
//!
//! Handles the group tree and memberships

use super::{lock, MockGroup, MockKeycloakClient};
use crate::error::KeycloakError;
use crate::models::Group;
use std::collections::BTreeMap;

pub(crate) fn insert(client: &MockKeycloakClient, name: &str, parent: Option<String>) -> String {
    let id = client.next_id();
    lock(&client.groups).insert(
        id.clone(),
        MockGroup {
            name: name.to_string(),
            parent,
        },
    );
    id
}

pub(crate) fn id_by_path(client: &MockKeycloakClient, path: &str) -> Option<String> {
    let groups = lock(&client.groups).clone();
    let mut current: Option<String> = None;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let next = groups
            .iter()
            .find(|(_, group)| group.name == segment && group.parent == current)
            .map(|(id, _)| id.clone())?;
        current = Some(next);
    }
    current
}

fn path_of(groups: &BTreeMap<String, MockGroup>, id: &str) -> String {
    let mut segments = Vec::new();
    let mut cursor = groups.get(id);
    while let Some(group) = cursor {
        segments.push(group.name.clone());
        cursor = group.parent.as_deref().and_then(|parent| groups.get(parent));
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

fn build(groups: &BTreeMap<String, MockGroup>, id: &str) -> Option<Group> {
    let node = groups.get(id)?;
    let mut sub_groups: Vec<Group> = groups
        .iter()
        .filter(|(_, group)| group.parent.as_deref() == Some(id))
        .filter_map(|(child_id, _)| build(groups, child_id))
        .collect();
    sub_groups.sort_by(|a, b| a.name.cmp(&b.name));
    Some(Group {
        id: id.to_string(),
        name: node.name.clone(),
        path: Some(path_of(groups, id)),
        sub_group_count: Some(sub_groups.len() as u64),
        sub_groups,
    })
}

pub(crate) fn representation(client: &MockKeycloakClient, id: &str) -> Option<Group> {
    let groups = lock(&client.groups).clone();
    build(&groups, id)
}

pub async fn find_groups_by_name(client: &MockKeycloakClient, name: &str) -> Result<Vec<Group>, KeycloakError> {
    client.check_failure("find_groups_by_name")?;
    let groups = lock(&client.groups).clone();
    let mut found: Vec<Group> = groups
        .iter()
        .filter(|(_, group)| group.parent.is_none() && group.name.contains(name))
        .filter_map(|(id, _)| build(&groups, id))
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

pub async fn get_group(client: &MockKeycloakClient, id: &str) -> Result<Group, KeycloakError> {
    client.check_failure("get_group")?;
    representation(client, id).ok_or_else(|| KeycloakError::NotFound(format!("Group {} not found", id)))
}

pub async fn create_child_group(client: &MockKeycloakClient, parent_id: &str, name: &str) -> Result<Group, KeycloakError> {
    client.check_failure("create_child_group")?;
    {
        let groups = lock(&client.groups);
        if !groups.contains_key(parent_id) {
            return Err(KeycloakError::NotFound(format!("Group {} not found", parent_id)));
        }
        let duplicate = groups
            .values()
            .any(|group| group.parent.as_deref() == Some(parent_id) && group.name == name);
        if duplicate {
            return Err(KeycloakError::InvalidRequest(format!(
                "Sibling group named '{}' already exists",
                name
            )));
        }
    }

    let id = insert(client, name, Some(parent_id.to_string()));
    representation(client, &id).ok_or_else(|| KeycloakError::Api(format!("Group {} vanished", id)))
}

pub async fn delete_group(client: &MockKeycloakClient, id: &str) -> Result<(), KeycloakError> {
    client.check_failure("delete_group")?;
    let mut groups = lock(&client.groups);
    if !groups.contains_key(id) {
        return Err(KeycloakError::NotFound(format!("Group {} not found", id)));
    }

    let mut doomed = vec![id.to_string()];
    let mut index = 0;
    while index < doomed.len() {
        let parent = doomed[index].clone();
        doomed.extend(
            groups
                .iter()
                .filter(|(_, group)| group.parent.as_deref() == Some(parent.as_str()))
                .map(|(child, _)| child.clone()),
        );
        index += 1;
    }

    let mut members = lock(&client.members);
    for group_id in &doomed {
        groups.remove(group_id);
        members.remove(group_id);
    }
    Ok(())
}

pub async fn add_user_to_group(client: &MockKeycloakClient, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
    client.check_failure("add_user_to_group")?;
    if !lock(&client.groups).contains_key(group_id) {
        return Err(KeycloakError::NotFound(format!("Group {} not found", group_id)));
    }
    client.add_member(group_id, user_id);
    Ok(())
}

pub async fn remove_user_from_group(client: &MockKeycloakClient, user_id: &str, group_id: &str) -> Result<(), KeycloakError> {
    client.check_failure("remove_user_from_group")?;
    if !lock(&client.groups).contains_key(group_id) {
        return Err(KeycloakError::NotFound(format!("Group {} not found", group_id)));
    }
    if let Some(users) = lock(&client.members).get_mut(group_id) {
        users.remove(user_id);
    }
    Ok(())
}
