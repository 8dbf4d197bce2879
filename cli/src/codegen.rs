//! Rust code generation for compiled stacks
//!
//! The pipeline description is flattened into plain strings here and handed
//! to an embedded liquid template, so the template only lays text out.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use include_dir::{Dir, include_dir};
use liquid::ParserBuilder;
use serde::Serialize;
use typed_middleware::{
    CompiledStack, InterfaceDecl, MethodSig, QualifiedName, ROOT_PACKAGE, Receiver, SymbolTable,
    TypeRef,
};

use crate::config::GeneratorConfig;

/// Embedded templates directory
static TEMPLATES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/templates");

const STACK_TEMPLATE: &str = "stack.rs.liquid";

#[derive(Debug, Serialize)]
struct FieldView {
    name: String,
    ty: String,
}

#[derive(Debug, Serialize)]
struct DelegateView {
    signature: String,
    call: String,
}

#[derive(Debug, Serialize)]
struct ContractImplView {
    contract: String,
    methods: Vec<DelegateView>,
}

#[derive(Debug, Serialize)]
struct StepView {
    position: usize,
    capability: String,
    call: String,
}

/// Render the generated Rust source for a compiled stack
///
/// `source` names the file the stack was read from and only appears in the
/// generated header.
pub fn render_stack<T>(
    compiled: &CompiledStack,
    table: &T,
    config: &GeneratorConfig,
    source: &str,
) -> Result<String>
where
    T: SymbolTable + ?Sized,
{
    let runtime = &config.output.runtime_crate;
    let root = &compiled.pipeline.target;
    let root_path = rust_path(root);
    let fields = field_names(compiled);

    let field_views: Vec<FieldView> = compiled
        .ordered_components()
        .map(|c| FieldView {
            name: fields[&c.capability].clone(),
            ty: rust_path(&c.implementation),
        })
        .collect();

    let mut handled: HashSet<QualifiedName> = HashSet::new();
    let mut markers = Vec::new();
    let bundles = compiled.pipeline.steps.iter().filter_map(|s| s.bundle.as_ref());
    for stack in std::iter::once(root).chain(bundles) {
        if !handled.insert(stack.clone()) {
            continue;
        }
        let decl = contract(table, stack)?;
        if let Some(method) = decl.methods.first() {
            anyhow::bail!(
                "stack contract {stack} declares method {}(); stack contracts may only embed capabilities",
                method.name
            );
        }
        markers.push(rust_path(stack));
    }
    for component in compiled.graph.components() {
        handled.insert(component.capability.clone());
    }

    let mut contract_impls = Vec::new();
    for component in compiled.ordered_components() {
        let field = &fields[&component.capability];
        let implementation = rust_path(&component.implementation);
        let mut pending = vec![component.capability.clone()];
        let mut first = true;

        // The capability itself, then any non-capability contracts it embeds
        while let Some(name) = pending.pop() {
            if !first && !handled.insert(name.clone()) {
                continue;
            }
            first = false;

            let decl = contract(table, &name)?;
            let methods = decl
                .methods
                .iter()
                .map(|method| delegate(method, &implementation, field))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("cannot delegate {name} to {implementation}"))?;
            contract_impls.push(ContractImplView {
                contract: rust_path(&name),
                methods,
            });

            for embed in decl.embeds.iter().rev() {
                if let TypeRef::Declared(embedded) = embed
                    && !handled.contains(embedded)
                    && table.lookup(embedded).and_then(|s| s.as_interface()).is_some()
                {
                    pending.push(embedded.clone());
                }
            }
        }
    }

    let steps: Vec<StepView> = compiled
        .pipeline
        .steps
        .iter()
        .zip(compiled.ordered_components())
        .map(|(step, component)| {
            let mut args = format!("&self.{}, req", fields[&component.capability]);
            if step.pass_bundle {
                args.push_str(", self");
            }
            StepView {
                position: step.position,
                capability: step.capability.clone(),
                call: format!(
                    "{}::{}({args})",
                    rust_path(&step.implementation),
                    component.invocation.name
                ),
            }
        })
        .collect();

    let request_param = compiled
        .ordered_components()
        .next()
        .and_then(|c| c.invocation.params.first())
        .map(|p| {
            // Compiled invocations always take `&Request`, so `ty` renders borrowed
            if p.rendered.is_empty() {
                p.ty.to_string()
            } else {
                p.rendered.clone()
            }
        })
        .unwrap_or_else(|| format!("&{}", config.conventions.request_type));

    let context = liquid::object!({
        "source": source,
        "root": root_path,
        "stack_trait": format!("{}Stack", root.name),
        "stack_impl": format!("{}StackImpl", root.name),
        "runtime": runtime,
        "request_param": request_param,
        "fields": field_views,
        "contract_impls": contract_impls,
        "markers": markers,
        "steps": steps,
    });

    let template = TEMPLATES
        .get_file(STACK_TEMPLATE)
        .and_then(|f| f.contents_utf8())
        .context("Embedded stack template is missing")?;
    let parser = ParserBuilder::with_stdlib().build()?;
    let template = parser
        .parse(template)
        .context("Failed to parse stack template")?;

    template
        .render(&context)
        .context("Failed to render stack template")
}

fn contract<'t, T>(table: &'t T, name: &QualifiedName) -> Result<&'t InterfaceDecl>
where
    T: SymbolTable + ?Sized,
{
    table
        .lookup(name)
        .and_then(|s| s.as_interface())
        .with_context(|| format!("{name} is not an interface in the symbol table"))
}

/// A method of the aggregate that forwards to one component
fn delegate(method: &MethodSig, implementation: &str, field: &str) -> Result<DelegateView> {
    let receiver = match method.receiver {
        Receiver::Ref => Some(format!("&self.{field}")),
        Receiver::RefMut => Some(format!("&mut self.{field}")),
        Receiver::None => None,
        Receiver::Value => {
            anyhow::bail!("{}() takes self by value", method.name);
        }
    };
    let args: Vec<String> = receiver
        .into_iter()
        .chain(method.arg_names().map(str::to_string))
        .collect();

    Ok(DelegateView {
        signature: signature(method),
        call: format!("{implementation}::{}({})", method.name, args.join(", ")),
    })
}

/// Signature as declared, or rebuilt from its parts when none was recorded
fn signature(method: &MethodSig) -> String {
    if !method.rendered.is_empty() {
        return method.rendered.clone();
    }

    let receiver = match method.receiver {
        Receiver::None => None,
        Receiver::Ref => Some("&self".to_string()),
        Receiver::RefMut => Some("&mut self".to_string()),
        Receiver::Value => Some("self".to_string()),
    };
    let params: Vec<String> = receiver
        .into_iter()
        .chain(method.params.iter().map(|p| {
            let ty = if p.rendered.is_empty() {
                p.ty.to_string()
            } else {
                p.rendered.clone()
            };
            format!("{}: {ty}", p.name)
        }))
        .collect();

    match &method.output {
        Some(output) => format!("fn {}({}) -> {output}", method.name, params.join(", ")),
        None => format!("fn {}({})", method.name, params.join(", ")),
    }
}

/// Path of a declaration relative to the file root module
fn rust_path(name: &QualifiedName) -> String {
    if name.package == ROOT_PACKAGE {
        return name.name.clone();
    }
    match name.package.strip_prefix("self::") {
        Some(relative) => format!("{relative}::{}", name.name),
        None => name.to_string(),
    }
}

/// One field per component, named after its implementation
///
/// Implementations sharing a name in different packages are prefixed with
/// their package path.
fn field_names(compiled: &CompiledStack) -> HashMap<QualifiedName, String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for component in compiled.graph.components() {
        *counts
            .entry(to_snake_case(&component.implementation.name))
            .or_default() += 1;
    }

    compiled
        .graph
        .components()
        .iter()
        .map(|component| {
            let base = to_snake_case(&component.implementation.name);
            let name = if counts[&base] > 1 {
                let package = component
                    .implementation
                    .package
                    .split("::")
                    .filter(|segment| *segment != ROOT_PACKAGE)
                    .map(to_snake_case)
                    .collect::<Vec<_>>();
                if package.is_empty() {
                    base
                } else {
                    format!("{}_{base}", package.join("_"))
                }
            } else {
                base
            };
            (component.capability.clone(), name)
        })
        .collect()
}

/// `ClientIdMiddleware` → `client_id_middleware`, `HTTPAuth` → `http_auth`
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}
