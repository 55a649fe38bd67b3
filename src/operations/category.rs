use crate::db::filter::Filter;
use crate::db::store::Store;
use crate::error::{Error, Result};
use crate::models::category::Category;
use rusqlite::types::Value;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// One entry of the category tree shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub children: Vec<CategoryNode>,
}

/// Groups a flat category list under each category's parent. Categories whose
/// parent is absent from the list become roots.
pub fn build_category_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let known: HashSet<i64> = categories.iter().map(|c| c.pk).collect();
    let mut children: HashMap<i64, Vec<&Category>> = HashMap::new();
    let mut roots = Vec::new();
    for category in categories {
        match category.parent {
            Some(parent) if known.contains(&parent) && parent != category.pk => {
                children.entry(parent).or_default().push(category)
            }
            _ => roots.push(category),
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|root| build_node(root, &children, &mut visited))
        .collect()
}

fn build_node(
    category: &Category,
    children: &HashMap<i64, Vec<&Category>>,
    visited: &mut HashSet<i64>,
) -> Option<CategoryNode> {
    // stored data may contain a parent loop
    if !visited.insert(category.pk) {
        return None;
    }
    let nested = children
        .get(&category.pk)
        .map(|list| {
            list.iter()
                .filter_map(|child| build_node(child, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(CategoryNode {
        id: category.pk,
        name: category.name.clone(),
        children: nested,
    })
}

pub fn get_category_tree(store: &Store<Category>) -> Result<Vec<CategoryNode>> {
    Ok(build_category_tree(&store.get_all(&Filter::all())?))
}

pub fn get_category_names(store: &Store<Category>) -> Result<Vec<String>> {
    Ok(store
        .get_all(&Filter::all())?
        .into_iter()
        .map(|c| c.name)
        .collect())
}

pub fn add_category(store: &Store<Category>, name: &str, parent: Option<i64>) -> Result<i64> {
    let name = validate_name(name)?;
    ensure_name_is_free(store, name, None)?;
    if let Some(parent) = parent {
        require_category(store, parent)?;
    }

    let mut category = Category::new(name, parent);
    let pk = store.add(&mut category)?;
    info!(pk, name, ?parent, "category added");
    Ok(pk)
}

/// Renames and/or re-parents a category. `None` leaves the stored value as is.
pub fn edit_category(
    store: &Store<Category>,
    id: i64,
    new_name: Option<&str>,
    new_parent: Option<i64>,
) -> Result<()> {
    let current = require_category(store, id)?;

    let name = match new_name {
        Some(name) => {
            let name = validate_name(name)?;
            ensure_name_is_free(store, name, Some(id))?;
            name.to_string()
        }
        None => current.name,
    };

    if let Some(parent) = new_parent {
        require_category(store, parent)?;
        if creates_cycle(store, id, parent)? {
            return Err(Error::Cycle { child: id, parent });
        }
    }

    store.update(&Category {
        pk: id,
        name,
        parent: new_parent,
    })?;
    info!(pk = id, ?new_parent, "category edited");
    Ok(())
}

/// Deletes a category that has no sub-categories.
pub fn delete_category(store: &Store<Category>, id: i64) -> Result<()> {
    require_category(store, id)?;
    let children = store.get_all(&Filter::all().eq("parent", Value::Integer(id)))?;
    if !children.is_empty() {
        return Err(Error::HasChildren(id));
    }
    store.delete(id)?;
    info!(pk = id, "category deleted");
    Ok(())
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Category name cannot be empty"));
    }
    if name.chars().count() > 50 {
        return Err(Error::validation("Category name too long"));
    }
    Ok(name)
}

fn ensure_name_is_free(store: &Store<Category>, name: &str, except: Option<i64>) -> Result<()> {
    let taken = store
        .get_all(&Filter::all().eq("name", Value::Text(name.to_string())))?
        .into_iter()
        .any(|c| Some(c.pk) != except);
    if taken {
        return Err(Error::validation(format!("Category '{}' already exists", name)));
    }
    Ok(())
}

fn require_category(store: &Store<Category>, id: i64) -> Result<Category> {
    store.get(id)?.ok_or_else(|| Error::NotFound {
        table: "category".to_string(),
        pk: id,
    })
}

/// True when `parent` is `id` itself or one of its descendants.
fn creates_cycle(store: &Store<Category>, id: i64, parent: i64) -> Result<bool> {
    let parents: HashMap<i64, Option<i64>> = store
        .get_all(&Filter::all())?
        .into_iter()
        .map(|c| (c.pk, c.parent))
        .collect();

    let mut seen = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == id {
            return Ok(true);
        }
        if !seen.insert(current) {
            break;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Ok(false)
}
