//! Message identifiers.
//!
//! Flat numeric namespace: the thousands digit selects the domain, requests
//! are odd and their response is `request + 1`. Server pushes have no request.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum MessageId {
    // Login
    Login = 1,
    LoginResponse = 2,

    // Player
    CreatePlayer = 1001,
    CreatePlayerResponse = 1002,
    GetPlayerInfo = 1003,
    GetPlayerInfoResponse = 1004,
    UpdatePlayer = 1005,
    UpdatePlayerResponse = 1006,

    // Backpack
    GetBackpack = 2001,
    GetBackpackResponse = 2002,
    GetBackpackByType = 2003,
    GetBackpackByTypeResponse = 2004,
    UseItem = 2005,
    UseItemResponse = 2006,
    AddItem = 2007,
    AddItemResponse = 2008,
    BackpackUpdatePush = 2010,

    // Operator
    GetPlayerOperators = 3001,
    GetPlayerOperatorsResponse = 3002,
    AddOperator = 3003,
    AddOperatorResponse = 3004,
    LevelUpOperator = 3005,
    LevelUpOperatorResponse = 3006,
    EliteOperator = 3007,
    EliteOperatorResponse = 3008,
    UpgradeSkill = 3009,
    UpgradeSkillResponse = 3010,
    MasterSkill = 3011,
    MasterSkillResponse = 3012,
    UpdateOperatorHp = 3013,
    UpdateOperatorHpResponse = 3014,

    // Stage
    GetPlayerStages = 4001,
    GetPlayerStagesResponse = 4002,
    SaveStageRecord = 4003,
    SaveStageRecordResponse = 4004,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("unknown message id {0}")]
pub struct UnknownMessageId(pub i32);

impl MessageId {
    pub const ALL: [MessageId; 35] = [
        MessageId::Login,
        MessageId::LoginResponse,
        MessageId::CreatePlayer,
        MessageId::CreatePlayerResponse,
        MessageId::GetPlayerInfo,
        MessageId::GetPlayerInfoResponse,
        MessageId::UpdatePlayer,
        MessageId::UpdatePlayerResponse,
        MessageId::GetBackpack,
        MessageId::GetBackpackResponse,
        MessageId::GetBackpackByType,
        MessageId::GetBackpackByTypeResponse,
        MessageId::UseItem,
        MessageId::UseItemResponse,
        MessageId::AddItem,
        MessageId::AddItemResponse,
        MessageId::BackpackUpdatePush,
        MessageId::GetPlayerOperators,
        MessageId::GetPlayerOperatorsResponse,
        MessageId::AddOperator,
        MessageId::AddOperatorResponse,
        MessageId::LevelUpOperator,
        MessageId::LevelUpOperatorResponse,
        MessageId::EliteOperator,
        MessageId::EliteOperatorResponse,
        MessageId::UpgradeSkill,
        MessageId::UpgradeSkillResponse,
        MessageId::MasterSkill,
        MessageId::MasterSkillResponse,
        MessageId::UpdateOperatorHp,
        MessageId::UpdateOperatorHpResponse,
        MessageId::GetPlayerStages,
        MessageId::GetPlayerStagesResponse,
        MessageId::SaveStageRecord,
        MessageId::SaveStageRecordResponse,
    ];

    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_i32() == raw)
    }

    /// Stable label for logs (`REQ_*`, `RESP_*`, `PUSH_*`).
    pub const fn label(self) -> &'static str {
        match self {
            MessageId::Login => "REQ_LOGIN",
            MessageId::LoginResponse => "RESP_LOGIN",
            MessageId::CreatePlayer => "REQ_CREATE_PLAYER",
            MessageId::CreatePlayerResponse => "RESP_CREATE_PLAYER",
            MessageId::GetPlayerInfo => "REQ_GET_PLAYER_INFO",
            MessageId::GetPlayerInfoResponse => "RESP_GET_PLAYER_INFO",
            MessageId::UpdatePlayer => "REQ_UPDATE_PLAYER",
            MessageId::UpdatePlayerResponse => "RESP_UPDATE_PLAYER",
            MessageId::GetBackpack => "REQ_GET_BACKPACK",
            MessageId::GetBackpackResponse => "RESP_GET_BACKPACK",
            MessageId::GetBackpackByType => "REQ_GET_BACKPACK_BY_TYPE",
            MessageId::GetBackpackByTypeResponse => "RESP_GET_BACKPACK_BY_TYPE",
            MessageId::UseItem => "REQ_USE_ITEM",
            MessageId::UseItemResponse => "RESP_USE_ITEM",
            MessageId::AddItem => "REQ_ADD_ITEM",
            MessageId::AddItemResponse => "RESP_ADD_ITEM",
            MessageId::BackpackUpdatePush => "PUSH_BACKPACK_UPDATE",
            MessageId::GetPlayerOperators => "REQ_GET_PLAYER_OPERATORS",
            MessageId::GetPlayerOperatorsResponse => "RESP_GET_PLAYER_OPERATORS",
            MessageId::AddOperator => "REQ_ADD_OPERATOR",
            MessageId::AddOperatorResponse => "RESP_ADD_OPERATOR",
            MessageId::LevelUpOperator => "REQ_LEVEL_UP_OPERATOR",
            MessageId::LevelUpOperatorResponse => "RESP_LEVEL_UP_OPERATOR",
            MessageId::EliteOperator => "REQ_ELITE_OPERATOR",
            MessageId::EliteOperatorResponse => "RESP_ELITE_OPERATOR",
            MessageId::UpgradeSkill => "REQ_UPGRADE_SKILL",
            MessageId::UpgradeSkillResponse => "RESP_UPGRADE_SKILL",
            MessageId::MasterSkill => "REQ_MASTER_SKILL",
            MessageId::MasterSkillResponse => "RESP_MASTER_SKILL",
            MessageId::UpdateOperatorHp => "REQ_UPDATE_OPERATOR_HP",
            MessageId::UpdateOperatorHpResponse => "RESP_UPDATE_OPERATOR_HP",
            MessageId::GetPlayerStages => "REQ_GET_PLAYER_STAGES",
            MessageId::GetPlayerStagesResponse => "RESP_GET_PLAYER_STAGES",
            MessageId::SaveStageRecord => "REQ_SAVE_STAGE_RECORD",
            MessageId::SaveStageRecordResponse => "RESP_SAVE_STAGE_RECORD",
        }
    }

    pub const fn is_request(self) -> bool {
        let raw = self.as_i32();
        raw % 2 == 1
    }

    pub const fn is_push(self) -> bool {
        matches!(self, MessageId::BackpackUpdatePush)
    }

    /// Response paired with this request (`None` for responses and pushes).
    pub fn response(self) -> Option<MessageId> {
        if self.is_request() {
            Self::from_i32(self.as_i32() + 1)
        } else {
            None
        }
    }
}

impl From<MessageId> for i32 {
    fn from(id: MessageId) -> Self {
        id.as_i32()
    }
}

impl TryFrom<i32> for MessageId {
    type Error = UnknownMessageId;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_i32(raw).ok_or(UnknownMessageId(raw))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn labels_unique() {
        let mut set = HashSet::new();
        for id in MessageId::ALL {
            set.insert(id.label());
        }
        assert_eq!(set.len(), MessageId::ALL.len());
        let distinct: HashSet<_> = MessageId::ALL.iter().map(|id| id.as_i32()).collect();
        assert_eq!(distinct.len(), MessageId::ALL.len());
    }

    #[test]
    fn login_is_one() {
        assert_eq!(MessageId::Login.as_i32(), 1);
        assert_eq!(MessageId::try_from(2), Ok(MessageId::LoginResponse));
    }

    #[test]
    fn requests_pair_with_next_id() {
        for id in MessageId::ALL.iter().copied().filter(|id| id.is_request()) {
            let resp = id.response().expect("every request has a response");
            assert_eq!(resp.as_i32(), id.as_i32() + 1);
            assert!(!resp.is_request());
        }
        assert_eq!(MessageId::BackpackUpdatePush.response(), None);
        assert!(MessageId::BackpackUpdatePush.is_push());
    }

    #[test]
    fn unknown_id_rejected() {
        assert_eq!(MessageId::try_from(9999), Err(UnknownMessageId(9999)));
        assert_eq!(MessageId::from_i32(2009), None);
    }
}
