//! Collector.
//!
//! Walks a package's declarations once, partitioning them into the
//! per-package ordered status list and the topologically sorted struct
//! list, both read-only for the rest of emission.

use std::collections::{HashMap, HashSet};

use crate::ast::{Decl, FuncDef, Package, StructDef};
use crate::error::BackendError;
use crate::status::{Status, builtin_statuses, user_status};

/// The product of one collector pass over a package.
pub struct Collected {
    pub status_list: Vec<Status>,
    /// User-defined statuses only, keyed by message (for `return` lowering
    /// to resolve a status keyword to its mangled name).
    pub status_map: HashMap<String, Status>,
    /// All structs (built-in-independent), in dependency order: a struct
    /// that embeds another by value appears after the struct it embeds.
    pub struct_list: Vec<StructDef>,
    pub struct_map: HashMap<String, StructDef>,
    /// All functions, in source declaration order.
    pub func_list: Vec<FuncDef>,
}

/// Run the collector over `pkg`.
pub fn collect(pkg: &Package) -> Result<Collected, BackendError> {
    let mut status_list = builtin_statuses(&pkg.name);
    let mut status_map = HashMap::new();
    let mut structs: Vec<StructDef> = Vec::new();
    let mut func_list: Vec<FuncDef> = Vec::new();

    let mut user_index = 0usize;
    for file in &pkg.files {
        for decl in &file.decls {
            match decl {
                Decl::Status(s) => {
                    let Some(message) = &s.message else {
                        return Err(BackendError::BadSourceForm(
                            "status declaration message must be a quoted string literal"
                                .to_string(),
                        ));
                    };
                    let status = user_status(&pkg.name, user_index, s.is_error, message);
                    user_index += 1;
                    status_map.insert(message.clone(), status.clone());
                    status_list.push(status);
                }
                Decl::Struct(s) => structs.push(s.clone()),
                Decl::Func(f) => func_list.push(f.clone()),
            }
        }
    }

    let struct_list = topo_sort_structs(&pkg, structs)?;
    let struct_map = struct_list
        .iter()
        .map(|s| (pkg.interner.resolve(s.name).to_string(), s.clone()))
        .collect();

    Ok(Collected {
        status_list,
        status_map,
        struct_list,
        struct_map,
        func_list,
    })
}

/// Topologically sort structs so that any struct embedded by value appears
/// before the struct that embeds it. Delegated to a local Kahn's-algorithm
/// pass; a genuinely external collaborator would own this, but the backend
/// needs a correct order to be testable end to end.
fn topo_sort_structs(
    pkg: &Package,
    structs: Vec<StructDef>,
) -> Result<Vec<StructDef>, BackendError> {
    let by_name: HashMap<String, StructDef> = structs
        .iter()
        .map(|s| (pkg.interner.resolve(s.name).to_string(), s.clone()))
        .collect();

    let mut visited: HashSet<String> = HashSet::new();
    let mut in_progress: HashSet<String> = HashSet::new();
    let mut ordered: Vec<StructDef> = Vec::new();

    fn visit(
        name: &str,
        by_name: &HashMap<String, StructDef>,
        pkg: &Package,
        visited: &mut HashSet<String>,
        in_progress: &mut HashSet<String>,
        ordered: &mut Vec<StructDef>,
    ) -> Result<(), BackendError> {
        if visited.contains(name) {
            return Ok(());
        }
        let Some(def) = by_name.get(name) else {
            // References an unknown struct; not this pass's job to validate.
            return Ok(());
        };
        if !in_progress.insert(name.to_string()) {
            return Err(BackendError::CyclicStructs(format!(
                "struct '{name}' participates in a dependency cycle"
            )));
        }
        for field in &def.fields {
            if field.ty.pointers == 0 {
                if let crate::types::BaseType::Package(dep_name) = &field.ty.base {
                    visit(dep_name, by_name, pkg, visited, in_progress, ordered)?;
                }
            }
        }
        in_progress.remove(name);
        visited.insert(name.to_string());
        ordered.push(def.clone());
        Ok(())
    }

    for s in &structs {
        let name = pkg.interner.resolve(s.name).to_string();
        visit(
            &name,
            &by_name,
            pkg,
            &mut visited,
            &mut in_progress,
            &mut ordered,
        )?;
    }
    Ok(ordered)
}
