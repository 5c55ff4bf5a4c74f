//! Pahole-style structure layout rendering.

use std::fmt::Write;

use crate::analysis::cacheline::CACHELINE_BYTES;
use crate::analysis::typegraph::TypeSet;
use crate::types::{TypeArena, TypeClass};

/// Render the field layout of every cache-relevant structure in `types`.
///
/// Only structures at least one cache line wide are shown, in the set's
/// enumeration order. Members print in declared order with their byte
/// offset and own size; virtual-dispatch slots (no data-member offset)
/// are skipped. Name and size resolution for a member falls through at
/// most one typedef level and never expands nested structures.
pub fn report_layouts(arena: &TypeArena, types: &TypeSet) -> String
{
    let mut out = String::new();
    for id in types.iter() {
        let node = arena.get(id);
        let TypeClass::Structure { members } = &node.class else {
            continue;
        };
        let Some(size) = node.byte_size else {
            continue;
        };
        if size < CACHELINE_BYTES {
            continue;
        }
        let lines = size.div_ceil(CACHELINE_BYTES);
        let _ = writeln!(
            out,
            "{}: {} bytes, {} cache line{}, {} members",
            arena.display_name(id),
            size,
            lines,
            if lines == 1 { "" } else { "s" },
            members.len()
        );
        for member in members {
            let Some(offset) = member.byte_offset else {
                continue;
            };
            let type_name = member.ty.map_or("?", |ty| arena.display_name(ty));
            let member_size = member.ty.and_then(|ty| arena.display_size(ty));
            let _ = write!(out, "\t+{offset}\t");
            match member_size {
                Some(bytes) => {
                    let _ = write!(out, "{bytes}");
                }
                None => out.push('?'),
            }
            let _ = writeln!(out, "\t{type_name} {}", member.name);
        }
    }
    out
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::analysis::typegraph::collect_types;
    use crate::types::{Member, TypeNode};

    fn base(arena: &mut TypeArena, name: &str, size: u64) -> crate::types::TypeId
    {
        arena.push(TypeNode {
            name: name.to_string(),
            byte_size: Some(size),
            class: TypeClass::Base,
        })
    }

    #[test]
    fn test_two_cache_line_structure()
    {
        let mut arena = TypeArena::new();
        let u64_ty = base(&mut arena, "unsigned long", 8);
        let counters = arena.push(TypeNode {
            name: "counters".to_string(),
            byte_size: Some(128),
            class: TypeClass::Structure {
                members: vec![
                    Member {
                        name: "hits".to_string(),
                        byte_offset: Some(0),
                        ty: Some(u64_ty),
                    },
                    Member {
                        name: "misses".to_string(),
                        byte_offset: Some(64),
                        ty: Some(u64_ty),
                    },
                ],
            },
        });
        let set = collect_types(&arena, [counters]);
        let report = report_layouts(&arena, &set);
        assert!(report.contains("counters: 128 bytes, 2 cache lines, 2 members"));
        assert!(report.contains("\t+0\t8\tunsigned long hits"));
        assert!(report.contains("\t+64\t8\tunsigned long misses"));
    }

    #[test]
    fn test_small_structures_and_non_structures_filtered()
    {
        let mut arena = TypeArena::new();
        let int = base(&mut arena, "int", 4);
        let small = arena.push(TypeNode {
            name: "point".to_string(),
            byte_size: Some(8),
            class: TypeClass::Structure {
                members: vec![Member {
                    name: "x".to_string(),
                    byte_offset: Some(0),
                    ty: Some(int),
                }],
            },
        });
        let set = collect_types(&arena, [small, int]);
        assert!(report_layouts(&arena, &set).is_empty());
    }

    #[test]
    fn test_virtual_member_skipped_but_counted()
    {
        let mut arena = TypeArena::new();
        let int = base(&mut arena, "int", 4);
        let widget = arena.push(TypeNode {
            name: "widget".to_string(),
            byte_size: Some(64),
            class: TypeClass::Structure {
                members: vec![
                    Member {
                        name: "_vptr".to_string(),
                        byte_offset: None,
                        ty: None,
                    },
                    Member {
                        name: "id".to_string(),
                        byte_offset: Some(8),
                        ty: Some(int),
                    },
                ],
            },
        });
        let set = collect_types(&arena, [widget]);
        let report = report_layouts(&arena, &set);
        assert!(report.contains("2 members"));
        assert!(!report.contains("_vptr"));
        assert!(report.contains("\t+8\t4\tint id"));
    }
}
