// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface ILaunchpad {
        event TokenCreated(address indexed tokenAddress, address indexed creator, string name, string symbol);
        event TokensBought(address indexed buyer, uint256 tokenAmount, uint256 counterAmount);
        event TokensSold(address indexed seller, uint256 tokenAmount, uint256 counterAmount);

        function buyTokens(address tokenAddress, uint256 minTokensOut) external payable;
        function sellTokens(address tokenAddress, uint256 tokenAmount) external;
        function createToken(string name, string symbol, string metadata) external returns (address);

        function getTokenInfo(address tokenAddress) external view returns (
            string name,
            string symbol,
            string metadata,
            address creator,
            uint256 creatorAllocation,
            uint256 heldTokens,
            uint256 maxSupply,
            uint256 currentSupply,
            uint256 virtualTrust,
            uint256 virtualTokens,
            bool completed,
            uint256 creationTime
        );
        function getCurrentPrice(address tokenAddress) external view returns (uint256);
        function tokenUnlocked(address tokenAddress) external view returns (bool);
        function feePercent() external view returns (uint256);
        function defaultPostMigrationTransferFeePercent() external view returns (uint256);
        function getAllTokens() external view returns (address[] memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
