//! Human readable plan summary

use kube::ResourceExt;
use std::io::{self, Write};

use super::planner::GcPlan;
use super::usage::ImageUsage;

/// Print what `plan` is about to do
pub fn render(
    out: &mut impl Write,
    plan: &GcPlan,
    usage: &ImageUsage,
    remove_images: bool,
) -> io::Result<()> {
    if plan.is_empty() {
        return writeln!(out, "Nothing to do");
    }

    if !plan.to_squash.is_empty() {
        writeln!(out, "\nThe following Integration Kits will be squashed:")?;
        for chain in &plan.to_squash {
            for kit in &chain.kits {
                write!(out, "{}, ", kit.display_name())?;
            }
            writeln!(
                out,
                "will all be squashed into Integration Kit: {}",
                chain.anchor().display_name()
            )?;
        }

        writeln!(
            out,
            "\nThe following Integrations will updated with a new squashed Image and redeployed:"
        )?;
        for chain in &plan.to_squash {
            for integration in usage.integrations_for(chain.anchor().status_image()) {
                writeln!(
                    out,
                    "{} in namespace: {}",
                    integration.name_any(),
                    integration.namespace().unwrap_or_default()
                )?;
            }
        }
    }

    if !plan.to_delete.is_empty() {
        writeln!(out, "\nThe following Integration Kits will be deleted:")?;
        for kit in &plan.to_delete {
            writeln!(out, "{}", kit.display_name())?;
        }
        if remove_images {
            writeln!(
                out,
                "\nThe following Images will be deleted from the Image Registry:"
            )?;
            for kit in &plan.to_delete {
                writeln!(out, "{}", kit.status_image())?;
            }
        }
    }
    Ok(())
}
