/// Groups and their ordered members.
pub const GROUPS: &[(&str, &[&str])] = &[
    ("The First Group", &["Desiree", "Jessica Dollins"]),
    ("The Second Group", &["Christie Debrah", "Michelly Maldonado"]),
    ("The Third Group", &["Abbigale Lee"]),
    ("The FOURTH Group", &["Kris Ramsey"]),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("unknown group {0:?}")]
    UnknownGroup(String),
    #[error("{member:?} is not a member of {group:?}")]
    NotAMember { group: String, member: String },
}

pub fn groups() -> impl Iterator<Item = &'static str> {
    GROUPS.iter().map(|(group, _)| *group)
}

pub fn members(group: &str) -> Option<&'static [&'static str]> {
    GROUPS
        .iter()
        .find(|(name, _)| *name == group)
        .map(|(_, members)| *members)
}

pub fn validate(group: &str, member: &str) -> Result<(), RosterError> {
    let members = members(group).ok_or_else(|| RosterError::UnknownGroup(group.to_string()))?;
    if members.contains(&member) {
        Ok(())
    } else {
        Err(RosterError::NotAMember {
            group: group.to_string(),
            member: member.to_string(),
        })
    }
}
