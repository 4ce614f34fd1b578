//! 合约 ABI 定义
//!
//! 只声明 Agent 实际用到的函数与事件

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IAIOracleServiceManager {
        struct Task {
            string name;
            uint32 taskCreatedBlock;
        }

        event NewTaskCreated(uint32 indexed taskIndex, Task task);

        function latestTaskNum() external view returns (uint32);
        function taskStatus(uint32 taskIndex) external view returns (uint8);
        function taskRespondents(uint32 taskIndex) external view returns (address[] memory);
        function createNewTask(string memory name) external returns (Task memory);
        function respondToTask(Task calldata task, uint32 referenceTaskIndex, bytes calldata signature) external;
    }

    #[sol(rpc)]
    interface IAIAgent {
        function processTask(uint32 taskIndex, bool decision) external;
    }

    #[sol(rpc)]
    interface IAIAgentRegistry {
        function isRegistered(address agent) external view returns (bool);
        function registerAgent(address agent) external;
        function getAllAgents() external view returns (address[] memory);
        function getAgentDetails(address agent) external view returns (
            string memory modelType,
            string memory modelVersion,
            uint256 tasksCompleted,
            uint256 consensusParticipations,
            uint256 rewardsEarned
        );
    }

    #[sol(rpc)]
    interface IPredictionMarketHook {
        function resolveMarket(bytes32 marketId, bool outcome) external;
    }
}
