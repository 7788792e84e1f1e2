use super::commands::OutputFormat;
use super::utils::print_json;
use serde::Serialize;
use zkattest_crypto::{fr_to_hex, parse_field, JurisdictionTree};
use zkattest_types::ZkAttestResult;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AllowlistOutput {
    jurisdiction_root: String,
    count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    member: Option<MembershipOutput>,
}

/// The `merklePath`/`merkleHelper` pair a `ProofRequest` carries.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MembershipOutput {
    jurisdiction: String,
    leaf_index: u64,
    merkle_path: Vec<String>,
    merkle_helper: Vec<String>,
}

pub fn handle_allowlist(
    jurisdictions: &[String],
    member: Option<&str>,
    format: &OutputFormat,
) -> ZkAttestResult<()> {
    let ids = jurisdictions
        .iter()
        .enumerate()
        .map(|(i, s)| parse_field(&format!("jurisdiction[{}]", i), s))
        .collect::<ZkAttestResult<Vec<_>>>()?;
    let tree = JurisdictionTree::jurisdictions(ids)?;

    let member = match member {
        Some(id) => {
            let proof = tree.proof(&parse_field("member", id)?)?;
            Some(MembershipOutput {
                jurisdiction: fr_to_hex(&proof.leaf),
                leaf_index: proof.leaf_index,
                merkle_path: proof.siblings.iter().map(fr_to_hex).collect(),
                merkle_helper: proof
                    .path_bits()
                    .into_iter()
                    .map(|b| u8::from(b).to_string())
                    .collect(),
            })
        }
        None => None,
    };

    let output = AllowlistOutput {
        jurisdiction_root: fr_to_hex(&tree.root()),
        count: tree.len(),
        member,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Text => {
            println!("Jurisdictions: {}", output.count);
            println!("Root:          {}", output.jurisdiction_root);
            if let Some(member) = &output.member {
                println!();
                println!("Membership for {} (leaf {})", member.jurisdiction, member.leaf_index);
                println!("merklePath:");
                for sibling in &member.merkle_path {
                    println!("  {}", sibling);
                }
                println!("merkleHelper: [{}]", member.merkle_helper.join(", "));
            }
            Ok(())
        }
    }
}
