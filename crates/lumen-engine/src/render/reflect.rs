//! WGSL reflection through naga.
//!
//! The program is parsed and validated, then the `@location` inputs of the
//! vertex entry point and the members of the single uniform block are read
//! back with the layout naga computed for them.

use wgpu::naga::front::wgsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{AddressSpace, Binding, Handle, Module, ShaderStage, Type, TypeInner};

use super::{Location, ProgramVariable};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reflection {
    /// Sorted by location.
    pub attributes: Vec<ProgramVariable>,
    /// In declaration order; the location is the member index.
    pub uniforms: Vec<ProgramVariable>,
    pub uniform_block_size: u32,
}

pub fn reflect_wgsl(code: &str) -> Result<Reflection, String> {
    let module = wgsl::parse_str(code).map_err(|e| e.emit_to_string(code))?;
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(code))?;

    let vertex = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == ShaderStage::Vertex)
        .ok_or_else(|| "missing @vertex entry point".to_string())?;
    if !module.entry_points.iter().any(|ep| ep.stage == ShaderStage::Fragment) {
        return Err("missing @fragment entry point".into());
    }

    let mut attributes = Vec::new();
    for argument in &vertex.function.arguments {
        match (&argument.binding, &module.types[argument.ty].inner) {
            (Some(binding), _) => {
                attributes.extend(attribute(&module, argument.name.as_deref(), argument.ty, binding));
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(binding) = &member.binding {
                        attributes.extend(attribute(&module, member.name.as_deref(), member.ty, binding));
                    }
                }
            }
            (None, _) => {
                return Err(format!(
                    "vertex input '{}' has no binding",
                    argument.name.as_deref().unwrap_or("?")
                ));
            }
        }
    }
    attributes.sort_by_key(|a| a.location);

    let mut reflection = Reflection {
        attributes,
        ..Reflection::default()
    };

    let mut blocks = module
        .global_variables
        .iter()
        .filter(|(_, var)| var.space == AddressSpace::Uniform);
    if let Some((_, block)) = blocks.next() {
        if blocks.next().is_some() {
            return Err("only one uniform block is supported".into());
        }
        let TypeInner::Struct { members, span } = &module.types[block.ty].inner else {
            return Err(format!(
                "uniform '{}' must be a struct",
                block.name.as_deref().unwrap_or("?")
            ));
        };
        reflection.uniforms = members
            .iter()
            .enumerate()
            .map(|(index, member)| ProgramVariable {
                name: member.name.clone().unwrap_or_default(),
                location: Location(index as u32),
                offset: member.offset,
                size: size_of(&module, member.ty),
            })
            .collect();
        reflection.uniform_block_size = *span;
    }

    Ok(reflection)
}

/// Builtins such as `vertex_index` are not fed from buffers.
fn attribute(module: &Module, name: Option<&str>, ty: Handle<Type>, binding: &Binding) -> Option<ProgramVariable> {
    let Binding::Location { location, .. } = binding else {
        return None;
    };
    Some(ProgramVariable {
        name: name.unwrap_or_default().to_string(),
        location: Location(*location),
        offset: 0,
        size: size_of(module, ty),
    })
}

fn size_of(module: &Module, ty: Handle<Type>) -> u32 {
    module.types[ty].inner.size(module.to_ctx())
}
